// tests/control_socket.rs

use std::error::Error;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::time::{timeout, Duration};

use watchsync::control::{send_request, ControlServer, Request, Response};
use watchsync_test_utils::builders::TestDaemonBuilder;
use watchsync_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn socket_dir() -> Result<tempfile::TempDir, Box<dyn Error>> {
    Ok(tempfile::Builder::new().prefix("watchsync").tempdir()?)
}

async fn raw_exchange(socket: &Path, line: &[u8]) -> Result<String, Box<dyn Error>> {
    let mut stream = UnixStream::connect(socket).await?;
    stream.write_all(line).await?;
    stream.shutdown().await?;
    let mut reply = String::new();
    BufReader::new(stream).read_line(&mut reply).await?;
    Ok(reply)
}

#[tokio::test]
async fn client_drives_daemon_over_socket() -> TestResult {
    init_tracing();
    let dir = socket_dir()?;
    let socket = dir.path().join("ctl.sock");
    let h = TestDaemonBuilder::new().build();
    h.fs.add_dir("/data/app");

    let server = ControlServer::bind(&socket, h.daemon.clone())?;

    let client = async {
        let watched = send_request(
            &socket,
            &Request::WatchDir {
                local: "/data/app".into(),
                remote: "host1:backups/app".into(),
            },
        )
        .await?;
        assert_eq!(
            watched,
            Response::Ok("watching /data/app/ => host1:backups/app/".into())
        );

        let dup = send_request(
            &socket,
            &Request::WatchDir {
                local: "/data/app".into(),
                remote: "host1:backups/app".into(),
            },
        )
        .await?;
        assert!(!dup.is_ok());
        assert!(dup.message().contains("already watching"));

        let list = send_request(&socket, &Request::ListWatched {}).await?;
        assert_eq!(list, Response::Ok("/data/app/ => host1:backups/app/".into()));

        let removed = send_request(&socket, &Request::RemoveDir("/data/app".into())).await?;
        assert!(removed.is_ok());

        let empty = send_request(&socket, &Request::ListWatched {}).await?;
        assert_eq!(empty, Response::Ok("no watched directories".into()));

        let missing = send_request(&socket, &Request::RemoveDir("/data/app".into())).await?;
        assert!(matches!(missing, Response::Err(ref m) if m.contains("not watching")));

        let quit = send_request(&socket, &Request::Quit {}).await?;
        assert!(quit.is_ok());
        Ok::<_, Box<dyn Error>>(())
    };

    let (served, client) = timeout(Duration::from_secs(5), async {
        tokio::join!(server.run(), client)
    })
    .await?;
    served?;
    client?;

    assert!(h.daemon.is_shutdown());
    assert!(!socket.exists(), "socket file removed on exit");
    Ok(())
}

#[tokio::test]
async fn malformed_requests_get_error_and_server_keeps_serving() -> TestResult {
    init_tracing();
    let dir = socket_dir()?;
    let socket = dir.path().join("ctl.sock");
    let h = TestDaemonBuilder::new().build();
    let server = ControlServer::bind(&socket, h.daemon.clone())?;

    let client = async {
        let garbage = raw_exchange(&socket, b"this is not json\n").await?;
        assert!(garbage.starts_with(r#"{"err":"#), "got {garbage}");

        let unknown = raw_exchange(&socket, b"{\"format\":\"disk\"}\n").await?;
        assert!(unknown.starts_with(r#"{"err":"#), "got {unknown}");

        let empty = raw_exchange(&socket, b"").await?;
        assert!(empty.starts_with(r#"{"err":"#), "got {empty}");

        let list = raw_exchange(&socket, b"{\"listwatched\":{}}").await?;
        assert_eq!(list, "{\"ok\":\"no watched directories\"}\n");

        raw_exchange(&socket, b"{\"quitquitquit\":{}}\n").await?;
        Ok::<_, Box<dyn Error>>(())
    };

    let (served, client) = timeout(Duration::from_secs(5), async {
        tokio::join!(server.run(), client)
    })
    .await?;
    served?;
    client?;
    Ok(())
}

#[tokio::test]
async fn bind_replaces_stale_socket_file() -> TestResult {
    init_tracing();
    let dir = socket_dir()?;
    let socket: PathBuf = dir.path().join("nested").join("ctl.sock");
    std::fs::create_dir_all(socket.parent().unwrap())?;
    std::fs::write(&socket, b"stale")?;

    let h = TestDaemonBuilder::new().build();
    let server = ControlServer::bind(&socket, h.daemon.clone())?;
    assert_eq!(server.path(), socket.as_path());

    h.daemon.request_shutdown();
    timeout(Duration::from_secs(2), server.run()).await??;
    assert!(!socket.exists());
    Ok(())
}

#[tokio::test]
async fn connecting_without_daemon_is_an_error() -> TestResult {
    let dir = socket_dir()?;
    let res = send_request(&dir.path().join("absent.sock"), &Request::ListWatched {}).await;
    assert!(res.is_err());
    Ok(())
}

#[tokio::test]
async fn silent_client_times_out_and_server_moves_on() -> TestResult {
    init_tracing();
    let dir = socket_dir()?;
    let socket = dir.path().join("ctl.sock");
    let h = TestDaemonBuilder::new().build();
    let server = ControlServer::bind(&socket, h.daemon.clone())?
        .with_read_timeout(Duration::from_millis(100));

    let client = async {
        // Connects, sends half a line and never finishes it.
        let mut stalled = UnixStream::connect(&socket).await?;
        stalled.write_all(b"{\"listwatched\"").await?;
        let mut reply = String::new();
        BufReader::new(&mut stalled).read_line(&mut reply).await?;
        assert!(reply.contains("no request received"), "got {reply}");

        // Hangs up without sending anything.
        drop(UnixStream::connect(&socket).await?);

        let list = send_request(&socket, &Request::ListWatched {}).await?;
        assert!(list.is_ok());

        send_request(&socket, &Request::Quit {}).await?;
        Ok::<_, Box<dyn Error>>(())
    };

    let (served, client) = timeout(Duration::from_secs(5), async {
        tokio::join!(server.run(), client)
    })
    .await?;
    served?;
    client?;
    Ok(())
}
