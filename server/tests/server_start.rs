//! Start des Servers aus einer Konfiguration

use std::time::Duration;

use autotest_core::AutotestError;
use autotest_protocol::{Event, EventKind, Hello};
use autotest_server::{config::ServerConfig, Server};
use autotest_signaling::Connection;
use tokio::sync::watch;
use tokio::time::timeout;

const FRIST: Duration = Duration::from_secs(5);

fn test_config() -> ServerConfig {
    ServerConfig::aus_toml(
        r#"
        [netzwerk]
        bind_adresse = "127.0.0.1"
        port = 0

        [zugang]
        erlaubte_ids = ["z5423219"]

        [aufgaben]
        aktiviert = ["cs2521_lab1_2"]
        "#,
    )
    .unwrap()
}

#[test]
fn unbekannte_aufgabe_verhindert_start() {
    let mut config = test_config();
    config.aufgaben.aktiviert.push("cs9999_lab0".into());
    assert!(matches!(Server::neu(config), Err(AutotestError::Konfiguration(_))));
}

#[test]
fn standardkonfiguration_registriert_alle_rezepte() {
    let server = Server::neu(ServerConfig::default()).unwrap();
    assert_eq!(server.state().registry.len(), 4);
}

#[tokio::test]
async fn runner_bekommt_eingabe_vom_konfigurierten_server() {
    let server = Server::neu(test_config()).unwrap();
    let listener = server.binden().await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let laufend = tokio::spawn(listener.starten(shutdown_rx));

    let client = Connection::connect(addr).await.unwrap();
    let stdin = client.register_wait(EventKind::Stdin, true).unwrap();
    let ack = client.register_wait(EventKind::Ack, true).unwrap();
    client.run().unwrap();
    client.send(Event::Hello(Hello {
        task_id: Some("cs2521_lab1_2".into()),
        z_id: Some("z5423219".into()),
        ..Hello::default()
    }));

    let Event::Stdin(eingabe) = timeout(FRIST, stdin.recv()).await.unwrap().unwrap() else {
        panic!("Erwartet stdin");
    };
    assert!(eingabe
        .message
        .split_whitespace()
        .all(|z| z.parse::<i32>().is_ok()));
    assert!(matches!(
        timeout(FRIST, ack.recv()).await.unwrap().unwrap(),
        Event::Ack(_)
    ));

    // Shutdown schliesst offene Verbindungen
    shutdown_tx.send_replace(true);
    timeout(FRIST, client.getrennt()).await.unwrap();
    timeout(FRIST, laufend).await.unwrap().unwrap().unwrap();
}
