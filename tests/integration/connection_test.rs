// tests/integration/connection_test.rs

//! End-to-end tests for a single connection handler.
//! Tests: framing across reads, replies, registration, revocation, teardown.

use super::fixtures::*;
use super::test_helpers::*;
use protoserver::connection::{ConnectionSettings, DisconnectReason};
use protoserver::core::OutgoingReply;
use protoserver::core::color::ColorRgb;
use protoserver::core::engine::Component;
use protoserver::core::protocol::frame::encode_frame;
use protoserver::core::protocol::message::{HyperionRequest, hyperion_request};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

const ORIGIN: &str = "ProtoBuffer@192.168.1.20";

// ===== Framing =====

#[tokio::test]
async fn test_color_split_inside_length_prefix() {
    let mut conn = TestConnection::start();
    let frame = frame_for(&color_request(100, RED, Some(1000)));

    conn.send_raw(&frame[..2]).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    conn.send_raw(&frame[2..]).await;

    assert_eq!(conn.read_reply().await, OutgoingReply::Success);
    assert_eq!(
        conn.engine.calls(),
        vec![
            EngineCall::Register {
                priority: 100,
                component: Component::Color,
                origin: ORIGIN.to_string(),
                owner: TEST_CONNECTION_ID,
                smoothing_cfg: 0,
            },
            EngineCall::SetColor {
                priority: 100,
                color: ColorRgb::new(255, 0, 0),
                timeout_ms: Some(1000),
                origin: ORIGIN.to_string(),
                clear_effects: true,
            },
        ]
    );
}

#[tokio::test]
async fn test_frame_delivered_one_byte_at_a_time() {
    let mut conn = TestConnection::start();
    let frame = frame_for(&color_request(100, GREEN, None));

    for byte in frame.iter() {
        conn.send_raw(&[*byte]).await;
    }

    assert_eq!(conn.read_reply().await, OutgoingReply::Success);
    assert_eq!(conn.engine.color_calls().len(), 1);
}

#[tokio::test]
async fn test_two_frames_in_one_write_replied_in_order() {
    let mut conn = TestConnection::start();
    let mut bytes = frame_for(&unknown_request(42)).to_vec();
    bytes.extend_from_slice(&frame_for(&color_request(100, RED, None)));

    conn.send_raw(&bytes).await;

    assert_eq!(
        conn.read_reply().await,
        OutgoingReply::error("not implemented")
    );
    assert_eq!(conn.read_reply().await, OutgoingReply::Success);
}

// ===== Commands =====

#[tokio::test]
async fn test_color_without_duration_has_no_timeout() {
    let mut conn = TestConnection::start();

    conn.roundtrip(&color_request(100, RED, None)).await;

    match &conn.engine.color_calls()[0] {
        EngineCall::SetColor { timeout_ms, .. } => assert_eq!(*timeout_ms, None),
        other => panic!("Expected SetColor, got {:?}", other),
    }
}

#[tokio::test]
async fn test_clearall_does_not_register() {
    let mut conn = TestConnection::start();

    let reply = conn.roundtrip(&clearall_request(None)).await;

    assert_eq!(reply, OutgoingReply::Success);
    assert_eq!(conn.engine.calls(), vec![EngineCall::ClearAll(false)]);
}

#[tokio::test]
async fn test_clearall_forwards_force_flag() {
    let mut conn = TestConnection::start();

    conn.roundtrip(&clearall_request(Some(true))).await;

    assert_eq!(conn.engine.calls(), vec![EngineCall::ClearAll(true)]);
}

#[tokio::test]
async fn test_clear_forwards_priority() {
    let mut conn = TestConnection::start();

    let reply = conn.roundtrip(&clear_request(150)).await;

    assert_eq!(reply, OutgoingReply::Success);
    assert_eq!(conn.engine.calls(), vec![EngineCall::Clear(150)]);
}

#[tokio::test]
async fn test_unknown_command_keeps_connection_open() {
    let mut conn = TestConnection::start();

    let reply = conn.roundtrip(&unknown_request(42)).await;
    assert_eq!(reply, OutgoingReply::error("not implemented"));
    assert!(conn.engine.calls().is_empty());

    let reply = conn.roundtrip(&color_request(100, RED, None)).await;
    assert_eq!(reply, OutgoingReply::Success);
    assert!(!conn.task.is_finished());
}

#[tokio::test]
async fn test_request_without_command_tag_keeps_connection_open() {
    let mut conn = TestConnection::start();

    // A zero-length payload is a request with no fields set.
    conn.send_raw(&[0, 0, 0, 0]).await;
    assert_eq!(
        conn.read_reply().await,
        OutgoingReply::error("not implemented")
    );

    let no_tag = HyperionRequest {
        command: None,
        ..color_request(100, RED, None)
    };
    assert_eq!(
        conn.roundtrip(&no_tag).await,
        OutgoingReply::error("not implemented")
    );
    assert!(conn.engine.calls().is_empty());

    assert_eq!(
        conn.roundtrip(&color_request(100, RED, None)).await,
        OutgoingReply::Success
    );
    assert!(!conn.task.is_finished());
}

#[tokio::test]
async fn test_image_success() {
    let mut conn = TestConnection::start();

    let reply = conn
        .roundtrip(&image_request(200, 2, 1, &two_pixel_image(), Some(500)))
        .await;

    assert_eq!(reply, OutgoingReply::Success);
    assert_eq!(
        conn.engine.calls(),
        vec![
            EngineCall::Register {
                priority: 200,
                component: Component::Image,
                origin: ORIGIN.to_string(),
                owner: TEST_CONNECTION_ID,
                smoothing_cfg: 0,
            },
            EngineCall::SetImage {
                priority: 200,
                width: 2,
                height: 1,
                timeout_ms: Some(500),
                clear_effect: false,
            },
        ]
    );
}

#[tokio::test]
async fn test_image_size_mismatch() {
    let mut conn = TestConnection::start();

    let reply = conn
        .roundtrip(&image_request(200, 3, 1, &two_pixel_image(), None))
        .await;

    assert_eq!(
        reply,
        OutgoingReply::error("Size of image data does not match with the width and height")
    );
    // The claim is announced before the size is checked.
    assert_eq!(conn.engine.registrations().len(), 1);
    assert!(
        !conn
            .engine
            .calls()
            .iter()
            .any(|c| matches!(c, EngineCall::SetImage { .. }))
    );
}

#[tokio::test]
async fn test_image_negative_dimensions_rejected() {
    let mut conn = TestConnection::start();

    let reply = conn
        .roundtrip(&image_request(200, -2, -1, &two_pixel_image(), None))
        .await;

    assert_eq!(
        reply,
        OutgoingReply::error("Size of image data does not match with the width and height")
    );
}

#[tokio::test]
async fn test_image_rejected_by_engine() {
    let mut conn = TestConnection::start();
    conn.engine.set_reject_images(true);

    let reply = conn
        .roundtrip(&image_request(200, 2, 1, &two_pixel_image(), None))
        .await;

    assert_eq!(reply, OutgoingReply::error("Unable to set image: output is busy"));
    assert!(!conn.task.is_finished());
}

// ===== Registration =====

#[tokio::test]
async fn test_same_priority_registers_once() {
    let mut conn = TestConnection::start();

    conn.roundtrip(&color_request(100, RED, None)).await;
    conn.roundtrip(&color_request(100, GREEN, None)).await;
    conn.roundtrip(&image_request(100, 2, 1, &two_pixel_image(), None))
        .await;

    assert_eq!(conn.engine.registrations().len(), 1);
    assert_eq!(conn.engine.color_calls().len(), 2);
}

#[tokio::test]
async fn test_priority_change_registers_again() {
    let mut conn = TestConnection::start();

    conn.roundtrip(&color_request(100, RED, None)).await;
    conn.roundtrip(&color_request(101, RED, None)).await;
    conn.roundtrip(&color_request(100, RED, None)).await;

    let priorities: Vec<i32> = conn
        .engine
        .registrations()
        .iter()
        .map(|c| match c {
            EngineCall::Register { priority, .. } => *priority,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(priorities, vec![100, 101, 100]);
}

#[tokio::test]
async fn test_revocation_forces_reregistration() {
    let mut conn = TestConnection::start();

    conn.roundtrip(&color_request(50, RED, None)).await;
    conn.control.revoke(50);
    conn.roundtrip(&color_request(50, RED, None)).await;

    assert_eq!(conn.engine.registrations().len(), 2);
}

#[tokio::test]
async fn test_revocation_of_other_priority_is_ignored() {
    let mut conn = TestConnection::start();

    conn.roundtrip(&color_request(50, RED, None)).await;
    conn.control.revoke(7);
    conn.roundtrip(&color_request(50, RED, None)).await;

    assert_eq!(conn.engine.registrations().len(), 1);
}

#[tokio::test]
async fn test_revocation_before_any_registration_is_ignored() {
    let mut conn = TestConnection::start();

    conn.control.revoke(50);
    conn.control.revoke(50);
    conn.roundtrip(&color_request(50, RED, None)).await;

    assert_eq!(conn.engine.registrations().len(), 1);
}

#[tokio::test]
async fn test_settings_flow_into_registration() {
    let settings = ConnectionSettings {
        smoothing_cfg: 3,
        origin: "Grabber@10.0.0.7".to_string(),
        ..test_settings()
    };
    let mut conn = TestConnection::with_settings(settings);

    conn.roundtrip(&color_request(100, RED, None)).await;

    assert_eq!(
        conn.engine.registrations(),
        vec![EngineCall::Register {
            priority: 100,
            component: Component::Color,
            origin: "Grabber@10.0.0.7".to_string(),
            owner: TEST_CONNECTION_ID,
            smoothing_cfg: 3,
        }]
    );
}

// ===== Fatal errors =====

#[tokio::test]
async fn test_undecodable_payload_drops_connection() {
    let mut conn = TestConnection::start();

    conn.send_raw(&encode_frame(&[0xFF, 0xFF, 0xFF]).unwrap()).await;

    let (reason, rest, ended) = conn.finish().await;
    assert_eq!(reason, DisconnectReason::ProtocolViolation);
    assert!(rest.is_empty(), "no reply is sent for a bad payload");
    assert_eq!(ended.unwrap().reason, DisconnectReason::ProtocolViolation);
}

#[tokio::test]
async fn test_missing_color_body_drops_connection() {
    let mut conn = TestConnection::start();
    let request = HyperionRequest {
        command: Some(hyperion_request::Command::Color as i32),
        ..Default::default()
    };

    conn.send(&request).await;

    let (reason, rest, _) = conn.finish().await;
    assert_eq!(reason, DisconnectReason::ProtocolViolation);
    assert!(rest.is_empty());
}

#[tokio::test]
async fn test_replies_before_bad_frame_are_delivered() {
    let mut conn = TestConnection::start();
    let mut bytes = frame_for(&color_request(100, RED, None)).to_vec();
    bytes.extend_from_slice(&encode_frame(&[0xFF, 0xFF, 0xFF]).unwrap());

    conn.send_raw(&bytes).await;

    assert_eq!(conn.read_reply().await, OutgoingReply::Success);
    let (reason, rest, _) = conn.finish().await;
    assert_eq!(reason, DisconnectReason::ProtocolViolation);
    assert!(rest.is_empty());
}

#[tokio::test]
async fn test_oversized_frame_drops_connection() {
    let settings = ConnectionSettings {
        max_frame_size: 16,
        ..test_settings()
    };
    let mut conn = TestConnection::with_settings(settings);

    // Only the header is sent; the declared length alone is enough to reject.
    conn.send_raw(&1000u32.to_be_bytes()).await;

    let (reason, rest, _) = conn.finish().await;
    assert_eq!(reason, DisconnectReason::ProtocolViolation);
    assert!(rest.is_empty());
}

// ===== Lifecycle =====

#[tokio::test]
async fn test_peer_close() {
    let mut conn = TestConnection::start();
    conn.roundtrip(&color_request(100, RED, None)).await;

    conn.client.shutdown().await.unwrap();

    let (reason, _, ended) = conn.finish().await;
    assert_eq!(reason, DisconnectReason::PeerClosed);
    assert_eq!(ended.unwrap().reason, DisconnectReason::PeerClosed);
}

#[tokio::test]
async fn test_peer_close_with_partial_frame() {
    let mut conn = TestConnection::start();
    let frame = frame_for(&color_request(100, RED, None));

    conn.send_raw(&frame[..frame.len() - 1]).await;
    conn.client.shutdown().await.unwrap();

    let (reason, rest, _) = conn.finish().await;
    assert_eq!(reason, DisconnectReason::PeerClosed);
    assert!(rest.is_empty());
}

#[tokio::test]
async fn test_force_close() {
    let mut conn = TestConnection::start();
    conn.roundtrip(&color_request(100, RED, None)).await;
    let control = conn.control.clone();

    control.force_close();

    let (reason, rest, ended) = conn.finish().await;
    assert_eq!(reason, DisconnectReason::ForceClosed);
    assert!(rest.is_empty());
    let ended = ended.unwrap();
    assert_eq!(ended.id, TEST_CONNECTION_ID);
    assert_eq!(ended.addr, test_addr());
    assert!(control.is_closed());
    // Closing again after the end is harmless.
    control.force_close();
}

#[tokio::test]
async fn test_exactly_one_end_event() {
    let mut conn = TestConnection::start();
    conn.control.force_close();
    conn.control.force_close();

    let reason = (&mut conn.task).await.unwrap();
    assert_eq!(reason, DisconnectReason::ForceClosed);

    assert!(conn.events_rx.recv().await.is_some());
    // The handler and its guard are gone, so the channel is closed.
    assert!(conn.events_rx.recv().await.is_none());
}

// ===== Peers that stop reading =====

/// Color frames for `count` distinct writes of the same request.
fn color_burst(count: usize) -> Vec<u8> {
    let frame = frame_for(&color_request(100, RED, None));
    frame.iter().copied().cycle().take(frame.len() * count).collect()
}

#[tokio::test(start_paused = true)]
async fn test_force_close_while_peer_not_reading() {
    let mut conn = TestConnection::with_capacity(test_settings(), 64);

    // The replies to these overflow the 64-byte pipe back to the client.
    conn.send_raw(&color_burst(50)).await;
    conn.control.force_close();

    let reason = tokio::time::timeout(Duration::from_secs(3), &mut conn.task)
        .await
        .expect("handler must not hang on a full socket")
        .unwrap();
    assert_eq!(reason, DisconnectReason::ForceClosed);
    assert_eq!(
        conn.events_rx.recv().await.unwrap().reason,
        DisconnectReason::ForceClosed
    );
}

#[tokio::test(start_paused = true)]
async fn test_idle_timeout_while_peer_not_reading() {
    let settings = ConnectionSettings {
        idle_timeout: Duration::from_millis(300),
        ..test_settings()
    };
    let mut conn = TestConnection::with_capacity(settings, 64);

    conn.send_raw(&color_burst(50)).await;

    let reason = tokio::time::timeout(Duration::from_secs(3), &mut conn.task)
        .await
        .expect("handler must not hang on a full socket")
        .unwrap();
    assert_eq!(reason, DisconnectReason::IdleTimeout);
}

#[tokio::test]
async fn test_queued_replies_delivered_when_peer_catches_up() {
    let mut conn = TestConnection::with_capacity(test_settings(), 64);

    conn.send_raw(&color_burst(50)).await;

    for _ in 0..50 {
        assert_eq!(conn.read_reply().await, OutgoingReply::Success);
    }
    assert_eq!(conn.engine.color_calls().len(), 50);
    assert!(!conn.task.is_finished());
}

// ===== Idle timeout =====

#[tokio::test(start_paused = true)]
async fn test_idle_timeout_without_traffic() {
    let conn = TestConnection::start();
    let started = tokio::time::Instant::now();

    let (reason, rest, ended) = conn.finish().await;

    assert_eq!(reason, DisconnectReason::IdleTimeout);
    assert!(rest.is_empty(), "an idle timeout sends nothing");
    assert!(started.elapsed() >= Duration::from_secs(5));
    let ended = ended.unwrap();
    assert_eq!(ended.reason, DisconnectReason::IdleTimeout);
    assert_eq!(ended.id, TEST_CONNECTION_ID);
}

#[tokio::test(start_paused = true)]
async fn test_commands_rearm_idle_timer() {
    let mut conn = TestConnection::start();
    let started = tokio::time::Instant::now();

    tokio::time::sleep(Duration::from_secs(3)).await;
    conn.roundtrip(&color_request(100, RED, None)).await;
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(!conn.task.is_finished(), "timer should have been rearmed");

    let (reason, _, _) = conn.finish().await;
    assert_eq!(reason, DisconnectReason::IdleTimeout);
    assert!(started.elapsed() >= Duration::from_secs(8));
}

#[tokio::test(start_paused = true)]
async fn test_error_replies_also_rearm_idle_timer() {
    let mut conn = TestConnection::start();

    tokio::time::sleep(Duration::from_secs(4)).await;
    let reply = conn.roundtrip(&unknown_request(9)).await;
    assert!(!reply.is_success());
    tokio::time::sleep(Duration::from_secs(4)).await;

    assert!(!conn.task.is_finished());
}

#[tokio::test(start_paused = true)]
async fn test_partial_frame_does_not_rearm_idle_timer() {
    let mut conn = TestConnection::start();
    let frame = frame_for(&color_request(100, RED, None));
    let started = tokio::time::Instant::now();

    tokio::time::sleep(Duration::from_secs(3)).await;
    conn.send_raw(&frame[..3]).await;

    let (reason, _, _) = conn.finish().await;
    assert_eq!(reason, DisconnectReason::IdleTimeout);
    assert!(started.elapsed() < Duration::from_secs(6));
}

#[tokio::test(start_paused = true)]
async fn test_idle_timeout_after_registration_sends_nothing() {
    let mut conn = TestConnection::start();
    conn.roundtrip(&color_request(7, RED, None)).await;

    let (reason, rest, ended) = conn.finish().await;

    assert_eq!(reason, DisconnectReason::IdleTimeout);
    assert!(rest.is_empty());
    assert!(ended.is_some());
}
