use crate::config::BridgeConfig;
use crate::framing::{decode_frame, write_json};
use crate::message::{FeedbackMessage, PadMessage};
use anyhow::{Context, Result};
use padlink_bus::{Bus, BusId};
use padlink_gamepad::{Detach, Gamepad, NotificationFn, TargetHandle, UserData};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, trace, warn};

/// Drive one pad from one client until it disconnects.
///
/// The pad is created when the session starts and unplugged when it ends,
/// whatever the reason.
#[instrument(skip(stream, bus, config), fields(%peer))]
pub async fn serve<S>(
    stream: S,
    peer: SocketAddr,
    bus: Arc<Bus>,
    config: Arc<BridgeConfig>,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut pad = padlink_gamepad::create(bus, config.pad, &config.ids)
        .with_context(|| format!("failed to plug in a {} pad", config.pad))?;
    info!(target_id = %pad.target().id(), kind = %pad.kind(), "pad plugged in");

    // The callback runs on a driver thread: it only queues.
    let (tx, mut rx) = mpsc::unbounded_channel::<FeedbackMessage>();
    let on_feedback: Arc<NotificationFn> = Arc::new(
        move |_: BusId, _: TargetHandle, lm: u8, sm: u8, led: u8, _: &UserData| {
            let _ = tx.send(FeedbackMessage { lm, sm, led });
        },
    );
    pad.register_notification(on_feedback).context("failed to register feedback callback")?;

    let (reader, mut writer) = tokio::io::split(stream);
    let mut lines = BufReader::new(reader).lines();

    let outcome = loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if let Err(e) = handle_line(pad.as_mut(), &line) {
                        break Err(e);
                    }
                }
                Ok(None) => {
                    info!("client disconnected");
                    break Ok(());
                }
                Err(e) => break Err(anyhow::Error::new(e).context("read failed")),
            },
            Some(feedback) = rx.recv() => {
                trace!(?feedback, "forwarding feedback");
                if let Err(e) = write_json(&mut writer, &feedback).await {
                    break Err(e);
                }
            }
        }
    };

    pad.unregister_notification();
    match pad.close() {
        Ok(Detach::Removed) => info!("pad unplugged"),
        Ok(Detach::AlreadyDetached) => debug!("pad was already unplugged"),
        Err(e) => warn!(error = %e, "failed to unplug pad"),
    }
    outcome
}

fn handle_line(pad: &mut dyn Gamepad, line: &str) -> Result<()> {
    match decode_frame::<PadMessage>(line) {
        None => {
            trace!("ignoring non-object line");
            Ok(())
        }
        Some(Err(e)) => {
            warn!(error = %e, "skipping malformed frame");
            Ok(())
        }
        Some(Ok(msg)) => {
            msg.apply(pad);
            pad.update().context("failed to commit report")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use padlink_bus::backend::mock::{Mock, Submitted};
    use padlink_bus::{Feedback, TargetId};
    use padlink_protocol::TargetType;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;
    use tokio::time::timeout;

    fn peer() -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    async fn wait_for<F: Fn() -> bool>(cond: F) {
        timeout(Duration::from_secs(5), async {
            while !cond() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn frames_drive_pad_and_feedback_flows_back() {
        let mock = Mock::new();
        let bus = Bus::open(mock.clone()).unwrap();
        let config = Arc::new(BridgeConfig::default());
        let (client, server) = tokio::io::duplex(4096);
        let session = tokio::spawn(serve(server, peer(), bus, config));

        // First target allocated on a fresh mock.
        let id = TargetId(1);
        wait_for(|| mock.has_sink(id)).await;

        let (client_rd, mut client_wr) = tokio::io::split(client);
        client_wr.write_all(b"hello\n{\"lx\":\n{\"0\":true,\"ly\":1.0}\n").await.unwrap();
        wait_for(|| mock.submissions(id) == 2).await;
        let Some(Submitted::X360(r)) = mock.last_report(id) else { panic!("no report") };
        assert_eq!(r.buttons, 0x1000);
        assert_eq!(r.thumb_ly, -32767);

        mock.notify(
            id,
            Feedback { large_motor: 200, small_motor: 50, led_number: 1, lightbar: None },
        );
        let mut replies = BufReader::new(client_rd).lines();
        let reply = replies.next_line().await.unwrap().unwrap();
        assert_eq!(reply, r#"{"lm":200,"sm":50,"led":1}"#);

        drop(client_wr);
        drop(replies);
        session.await.unwrap().unwrap();
        assert_eq!(mock.live_targets(), 0);
        assert_eq!(mock.allocated_targets(), 0);
    }

    #[tokio::test]
    async fn commit_failure_ends_session() {
        let mock = Mock::new();
        let bus = Bus::open(mock.clone()).unwrap();
        let config =
            Arc::new(BridgeConfig { pad: TargetType::DualShock4Wired, ..Default::default() });
        let (mut client, server) = tokio::io::duplex(4096);
        let session = tokio::spawn(serve(server, peer(), bus, config));

        let id = TargetId(1);
        wait_for(|| mock.has_sink(id)).await;
        mock.unplug_externally(id);
        client.write_all(b"{\"0\":true}\n").await.unwrap();

        let err = session.await.unwrap().unwrap_err();
        assert!(format!("{err:#}").contains("failed to commit report"));
        assert_eq!(mock.allocated_targets(), 0);
    }

    #[tokio::test]
    async fn no_free_slot_refuses_session() {
        let mock = Mock::with_slots(0);
        let bus = Bus::open(mock.clone()).unwrap();
        let (_client, server) = tokio::io::duplex(64);
        let err = serve(server, peer(), bus, Arc::new(BridgeConfig::default())).await.unwrap_err();
        assert!(format!("{err:#}").contains("no free slot"));
    }
}
