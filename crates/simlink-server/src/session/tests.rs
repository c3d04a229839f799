//! Tests for the session state machine and the per-session viewer API.

use std::collections::BTreeMap;
use std::time::Duration;

use simlink_protocol::codec::{
    write_add_probe_message, write_init_message, write_remove_probe_message,
    write_set_simulation_delay_message,
};
use simlink_protocol::*;
use tokio::io::AsyncReadExt;
use uuid::Uuid;

use super::*;
use crate::error::SessionError;
use crate::test_support::{send, send_type, wait_until, Event, Harness};

fn sample_info() -> SimulationInfo {
    SimulationInfo {
        run_id: Uuid::new_v4(),
        scenario_name: "station".into(),
        scenario_date: None,
        scenario_authors: vec![],
        scenario_version: Some("2".into()),
        scenario_description: None,
        time_unit: "s".into(),
        space_unit: "m".into(),
        speed_unit: "m/s".into(),
        rotation_unit: "rad/s".into(),
        view_vector: Vector3::new(1.0, 0.0, 0.0),
        up_vector: Vector3::new(0.0, 0.0, 1.0),
        left_vector: Vector3::new(0.0, 1.0, 0.0),
        dimension: 1.5,
    }
}

#[tokio::test]
async fn viewer_presentation_sets_role_and_opens_output() {
    let h = Harness::new();
    let (session, mut client) = h.session().await;
    let task = tokio::spawn(session.clone().run());

    send_type(&mut client, MessageType::IAmViewer).await;
    wait_until(|| session.role().is_some()).await;

    assert_eq!(session.role(), Some(ConnectionRole::Viewer));
    assert_eq!(
        h.recorder.count(|e| matches!(e, Event::Opened(_))),
        1
    );

    session.send_idle_message(12.0, 0.5).await.unwrap();
    let mut reader = FrameReader::new(&mut client);
    assert_eq!(reader.read_message_header().await.unwrap(), MessageType::Idle);
    let idle = reader.read_idle_message().await.unwrap();
    assert_eq!((idle.time, idle.duration), (12.0, 0.5));

    send_type(&mut client, MessageType::Bye).await;
    assert_eq!(task.await.unwrap(), SessionEnd::Ended);
}

#[tokio::test]
async fn controller_init_fires_once_and_loop_continues() {
    let h = Harness::new();
    let (session, mut client) = h.session().await;
    let task = tokio::spawn(session.clone().run());

    let config = SimulationConfiguration {
        search_directory: None,
        xml_configuration: "<scenario name=\"x\"/>".into(),
    };
    send(&mut client, |buf| {
        codec::write_header(buf, MessageType::IAmController);
        write_init_message(buf, &config).unwrap();
    })
    .await;
    send_type(&mut client, MessageType::Play).await;
    wait_until(|| h.recorder.count(|e| *e == Event::Play) == 1).await;

    let inits: Vec<Event> = h
        .recorder
        .events()
        .into_iter()
        .filter(|e| matches!(e, Event::Init(_)))
        .collect();
    assert_eq!(inits, vec![Event::Init(config)]);
    assert_eq!(h.registry.len(), 1);
    assert!(!task.is_finished());

    drop(client);
    assert!(matches!(task.await.unwrap(), SessionEnd::Failed(_)));
}

#[tokio::test]
async fn controller_commands_dispatch_in_order() {
    let h = Harness::new();
    let (session, mut client) = h.session().await;
    let task = tokio::spawn(session.clone().run());

    let mut parameters = BTreeMap::new();
    parameters.insert("radius".to_string(), ProbeValue::Real(3.0));
    let probe = ProbeDescription {
        probe_id: ProbeIdentifier {
            place_id: Uuid::new_v4(),
            probe_name: "hall".into(),
        },
        probe_type: "density".into(),
        parameters,
    };
    send(&mut client, |buf| {
        codec::write_header(buf, MessageType::IAmBoth);
        codec::write_header(buf, MessageType::Step);
        codec::write_header(buf, MessageType::Pause);
        write_add_probe_message(buf, &probe).unwrap();
        write_remove_probe_message(buf, &probe.probe_id).unwrap();
        write_set_simulation_delay_message(buf, 125);
        codec::write_header(buf, MessageType::KillSimulator);
        codec::write_header(buf, MessageType::Stop);
        codec::write_header(buf, MessageType::Bye);
    })
    .await;

    assert_eq!(task.await.unwrap(), SessionEnd::Ended);
    let events: Vec<Event> = h
        .recorder
        .events()
        .into_iter()
        .filter(|e| !matches!(e, Event::Opened(_) | Event::Closed(_)))
        .collect();
    assert_eq!(
        events,
        vec![
            Event::Step,
            Event::Pause,
            Event::AddProbe(probe.clone()),
            Event::RemoveProbe(probe.probe_id.clone()),
            Event::Delay(125),
            Event::Kill,
            Event::Stop,
            // BYE from a controller
            Event::Stop,
        ]
    );
    assert_eq!(session.role(), Some(ConnectionRole::Both));
}

#[tokio::test]
async fn controller_bye_ends_session_and_cleans_up() {
    let h = Harness::new();
    let (session, mut client) = h.session().await;
    let task = tokio::spawn(session.clone().run());

    send_type(&mut client, MessageType::IAmController).await;
    send_type(&mut client, MessageType::Bye).await;

    assert_eq!(task.await.unwrap(), SessionEnd::Ended);
    assert_eq!(h.recorder.count(|e| *e == Event::Stop), 1);
    assert!(h.registry.is_empty());
    assert_eq!(h.recorder.closed(), 1);
    assert_eq!(
        h.recorder.events().last(),
        Some(&Event::Closed(session.id().to_string()))
    );

    // The server side shut its half down.
    let mut rest = Vec::new();
    client.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn command_before_presentation_ends_session() {
    let h = Harness::new();
    let (session, mut client) = h.session().await;
    let (other, _other_client) = h.session().await;
    let task = tokio::spawn(session.clone().run());

    send_type(&mut client, MessageType::Play).await;

    assert_eq!(task.await.unwrap(), SessionEnd::Ended);
    assert_eq!(session.role(), None);
    assert_eq!(h.recorder.count(|e| *e == Event::Play), 0);
    let remaining = h.registry.snapshot();
    assert_eq!(remaining.len(), 1);
    assert!(Arc::ptr_eq(&remaining[0], &other));
}

#[tokio::test]
async fn viewer_may_only_say_bye() {
    let h = Harness::new();
    let (session, mut client) = h.session().await;
    let task = tokio::spawn(session.clone().run());

    send_type(&mut client, MessageType::IAmViewer).await;
    send_type(&mut client, MessageType::Play).await;

    assert_eq!(task.await.unwrap(), SessionEnd::Ended);
    assert_eq!(h.recorder.count(|e| *e == Event::Play), 0);
    assert_eq!(h.recorder.closed(), 1);
}

#[tokio::test]
async fn second_presentation_does_not_change_role() {
    let h = Harness::new();
    let (session, mut client) = h.session().await;
    let task = tokio::spawn(session.clone().run());

    send_type(&mut client, MessageType::IAmController).await;
    send_type(&mut client, MessageType::IAmViewer).await;

    assert_eq!(task.await.unwrap(), SessionEnd::Ended);
    assert_eq!(session.role(), Some(ConnectionRole::Controller));
}

#[tokio::test]
async fn peer_disconnect_is_a_failure_with_one_close_event() {
    let h = Harness::new();
    let (session, client) = h.session().await;
    let task = tokio::spawn(session.clone().run());

    drop(client);

    assert!(matches!(task.await.unwrap(), SessionEnd::Failed(_)));
    assert!(h.registry.is_empty());
    assert_eq!(h.recorder.closed(), 1);
    assert_eq!(h.recorder.count(|e| matches!(e, Event::Opened(_))), 1);
}

#[tokio::test]
async fn close_connection_is_observed_between_reads() {
    let h = Harness::new();
    let (session, mut client) = h.session().await;
    let task = tokio::spawn(session.clone().run());

    send_type(&mut client, MessageType::IAmController).await;
    wait_until(|| session.role().is_some()).await;

    session.close_connection();
    assert!(session.is_stop_requested());
    // Still blocked in the read; nothing has been torn down yet.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!task.is_finished());
    assert_eq!(h.registry.len(), 1);

    send_type(&mut client, MessageType::Play).await;
    assert_eq!(task.await.unwrap(), SessionEnd::StopRequested);
    assert_eq!(h.recorder.count(|e| *e == Event::Play), 1);
    assert!(h.registry.is_empty());
}

#[tokio::test]
async fn run_twice_fails_the_second_time() {
    let h = Harness::new();
    let (session, client) = h.session().await;
    let first = tokio::spawn(session.clone().run());
    wait_until(|| h.recorder.count(|e| matches!(e, Event::Opened(_))) == 1).await;

    assert!(matches!(
        session.clone().run().await,
        SessionEnd::Failed(_)
    ));

    drop(client);
    first.await.unwrap();
    assert_eq!(h.recorder.count(|e| matches!(e, Event::Opened(_))), 1);
}

// ---------------------------------------------------------------------------
// Viewer send API
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sends_before_presentation_are_rejected() {
    let h = Harness::new();
    let (session, _client) = h.session().await;

    let err = session.send_end_message().await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidRole { role: None, .. }));
}

#[tokio::test]
async fn controller_cannot_receive_viewer_frames() {
    let h = Harness::new();
    let (session, mut client) = h.session().await;
    let task = tokio::spawn(session.clone().run());

    send_type(&mut client, MessageType::IAmController).await;
    wait_until(|| session.role().is_some()).await;

    let err = session
        .send_start_message(&sample_info(), &[])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::InvalidRole {
            role: Some(ConnectionRole::Controller),
            ..
        }
    ));
    assert!(!session.has_pending_end_message());
    assert!(session.send_probe_message(1.0, &[]).await.is_err());
    assert!(session.send_killed_message().await.is_err());

    send_type(&mut client, MessageType::Bye).await;
    task.await.unwrap();

    let mut written = Vec::new();
    client.read_to_end(&mut written).await.unwrap();
    assert!(written.is_empty());
}

#[tokio::test]
async fn killed_after_start_sends_end_first() {
    let h = Harness::new();
    let (session, mut client) = h.session().await;
    let _task = tokio::spawn(session.clone().run());

    send_type(&mut client, MessageType::IAmViewer).await;
    wait_until(|| session.role().is_some()).await;

    let info = sample_info();
    session.send_start_message(&info, &[]).await.unwrap();
    assert!(session.has_pending_end_message());
    session.send_killed_message().await.unwrap();
    assert!(!session.has_pending_end_message());

    let mut reader = FrameReader::new(&mut client);
    assert_eq!(reader.read_message_header().await.unwrap(), MessageType::Start);
    assert_eq!(reader.read_start_message().await.unwrap().info, info);
    assert_eq!(reader.read_message_header().await.unwrap(), MessageType::End);
    assert_eq!(reader.read_message_header().await.unwrap(), MessageType::Killed);
}

#[tokio::test]
async fn end_clears_pending_so_killed_stands_alone() {
    let h = Harness::new();
    let (session, mut client) = h.session().await;
    let _task = tokio::spawn(session.clone().run());

    send_type(&mut client, MessageType::IAmBoth).await;
    wait_until(|| session.role().is_some()).await;

    session.send_start_message(&sample_info(), &[]).await.unwrap();
    session.send_end_message().await.unwrap();
    assert!(!session.has_pending_end_message());
    session.send_killed_message().await.unwrap();

    let mut reader = FrameReader::new(&mut client);
    assert_eq!(reader.read_message_header().await.unwrap(), MessageType::Start);
    reader.read_start_message().await.unwrap();
    assert_eq!(reader.read_message_header().await.unwrap(), MessageType::End);
    assert_eq!(reader.read_message_header().await.unwrap(), MessageType::Killed);
}

#[tokio::test]
async fn closed_viewer_has_no_output_stream() {
    let h = Harness::new();
    let (session, mut client) = h.session().await;
    let task = tokio::spawn(session.clone().run());

    send_type(&mut client, MessageType::IAmViewer).await;
    send_type(&mut client, MessageType::Bye).await;
    task.await.unwrap();

    let err = session
        .send_deletion_message(1.0, &[Uuid::nil()])
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::NoOutputStream(_)));
}

#[tokio::test]
async fn failed_killed_keeps_end_pending() {
    let h = Harness::new();
    let (session, mut client) = h.session().await;
    let _task = tokio::spawn(session.clone().run());

    send_type(&mut client, MessageType::IAmViewer).await;
    wait_until(|| session.role().is_some()).await;

    session.send_start_message(&sample_info(), &[]).await.unwrap();
    session.release_output().await;

    let err = session.send_killed_message().await.unwrap_err();
    assert!(matches!(err, SessionError::NoOutputStream(_)));
    assert!(session.has_pending_end_message());

    let err = session.send_end_message().await.unwrap_err();
    assert!(matches!(err, SessionError::NoOutputStream(_)));
    assert!(session.has_pending_end_message());
}

#[tokio::test]
async fn oversized_payload_is_refused_without_writing() {
    let h = Harness::new();
    let (session, mut client) = h.session().await;
    let _task = tokio::spawn(session.clone().run());

    send_type(&mut client, MessageType::IAmViewer).await;
    wait_until(|| session.role().is_some()).await;

    let mut values = BTreeMap::new();
    values.insert(
        "label".to_string(),
        ProbeValue::Text("x".repeat(codec::MAX_STRING_LEN + 1)),
    );
    let probes = [ProbeInfo {
        place_id: Uuid::new_v4(),
        probe_name: "gate".into(),
        values,
    }];
    let err = session.send_probe_message(1.0, &probes).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Codec(CodecError::StringTooLong(_))
    ));

    // Nothing reached the socket, so the next frame is read cleanly.
    session.send_idle_message(2.0, 0.5).await.unwrap();
    let mut reader = FrameReader::new(&mut client);
    assert_eq!(reader.read_message_header().await.unwrap(), MessageType::Idle);
    assert_eq!(reader.read_idle_message().await.unwrap().time, 2.0);
}
