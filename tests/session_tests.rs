use comterm::cli::output::recording::{RecordingSink, SinkEvent};
use comterm::core::receive;
use comterm::domain::profile::{DisplayColor, Parity, ProfileStore};
use comterm::infrastructure::ports::mock::MockPorts;
use comterm::infrastructure::settings::{SettingsStore, TomlSettings};
use comterm::{Connection, SessionController};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::BufReader;

fn session(
    ports: Vec<&str>,
    dir: &TempDir,
) -> (SessionController, Arc<Connection>, MockPorts, RecordingSink) {
    let opener = MockPorts::new(ports);
    let sink = RecordingSink::new();
    let conn = Arc::new(Connection::new(
        Box::new(opener.clone()),
        Box::new(sink.clone()),
        ProfileStore::new(),
    ));
    let controller = SessionController::new(
        Arc::clone(&conn),
        Box::new(TomlSettings::at_path(dir.path().join("profiles.toml"))),
        Arc::new(AtomicBool::new(true)),
    );
    (controller, conn, opener, sink)
}

#[tokio::test]
async fn receive_loop_renders_device_output_in_receive_color() {
    let dir = TempDir::new().unwrap();
    let (controller, conn, opener, sink) = session(vec!["COM1"], &dir);

    let running = Arc::new(AtomicBool::new(true));
    let loop_task = tokio::spawn(receive::run(Arc::clone(&conn), Arc::clone(&running)));

    controller
        .run(BufReader::new(&b".open COM1\n"[..]))
        .await
        .unwrap();
    opener.push_read(b"hello");

    tokio::time::sleep(Duration::from_millis(100)).await;
    running.store(false, Ordering::SeqCst);
    tokio::time::timeout(Duration::from_secs(2), loop_task)
        .await
        .unwrap()
        .unwrap();

    let events = sink.events();
    let pos = events
        .iter()
        .position(|e| e == &SinkEvent::Text("hello".to_string()))
        .expect("device bytes should be rendered");
    assert_eq!(events[pos - 1], SinkEvent::Color(DisplayColor::White));
    assert_eq!(events[pos + 1], SinkEvent::Color(DisplayColor::Gray));
}

#[tokio::test]
async fn send_file_streams_in_fixed_chunks() {
    let dir = TempDir::new().unwrap();
    let (controller, _conn, opener, sink) = session(vec!["COM1"], &dir);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&vec![0x55u8; 2500]).unwrap();
    file.flush().unwrap();

    let script = format!(".open COM1\n.send {}\n.exit\n", file.path().display());
    controller
        .run(BufReader::new(script.as_bytes()))
        .await
        .unwrap();

    let chunks: Vec<usize> = opener.writes().iter().map(Vec::len).collect();
    assert_eq!(chunks, vec![1024, 1024, 452]);
    assert!(sink.rendered_text().contains("Sent 2500 bytes"));
}

#[tokio::test]
async fn send_file_on_closed_port_sends_nothing() {
    let dir = TempDir::new().unwrap();
    let (controller, _conn, opener, sink) = session(vec!["COM1"], &dir);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"payload").unwrap();

    let script = format!(".send {}\n.exit\n", file.path().display());
    controller
        .run(BufReader::new(script.as_bytes()))
        .await
        .unwrap();

    assert!(opener.writes().is_empty());
    assert!(sink.rendered_text().contains("closed"));
}

#[tokio::test]
async fn settings_survive_across_sessions() {
    let dir = TempDir::new().unwrap();

    {
        let (controller, _conn, _opener, _sink) = session(vec!["COM1"], &dir);
        controller
            .run(BufReader::new(
                &b".open COM1 38400 8 odd\n.hex\n.color green darkgray\n.exit\n"[..],
            ))
            .await
            .unwrap();
    }

    let saved = TomlSettings::at_path(dir.path().join("profiles.toml"))
        .load()
        .unwrap();
    assert_eq!(saved.len(), 1);
    let profile = &saved[0];
    assert_eq!(profile.name, "COM1");
    assert_eq!(profile.baud_rate, 38400);
    assert_eq!(profile.parity, Parity::Odd);
    assert!(!profile.text_mode);
    assert_eq!(profile.receive_color, DisplayColor::Green);
    assert_eq!(profile.send_color, DisplayColor::DarkGray);
}

#[tokio::test]
async fn reopening_a_known_port_keeps_its_saved_parameters() {
    let dir = TempDir::new().unwrap();
    let opener = MockPorts::new(vec!["COM1"]);
    let sink = RecordingSink::new();

    let mut profile = comterm::PortProfile::new("COM1");
    profile.baud_rate = 57600;
    profile.text_mode = false;
    let conn = Arc::new(Connection::new(
        Box::new(opener.clone()),
        Box::new(sink.clone()),
        ProfileStore::from_profiles(vec![profile]),
    ));
    let controller = SessionController::new(
        Arc::clone(&conn),
        Box::new(TomlSettings::at_path(dir.path().join("profiles.toml"))),
        Arc::new(AtomicBool::new(true)),
    );

    controller
        .run(BufReader::new(&b".open COM1\n.exit\n"[..]))
        .await
        .unwrap();

    let staged = opener.staged();
    assert_eq!(staged.len(), 1);
    assert_eq!(staged[0].baud_rate, 57600);
    assert!(!staged[0].text_mode);
}

#[tokio::test]
async fn status_reports_profile_and_state() {
    let dir = TempDir::new().unwrap();
    let (controller, _conn, _opener, sink) = session(vec!["COM1"], &dir);

    controller
        .run(BufReader::new(&b".open COM1\n.status\n.exit\n"[..]))
        .await
        .unwrap();

    let text = sink.rendered_text();
    assert!(text.contains("COM1 9600,8,None,One"));
    assert!(text.contains("(open)"));
}
