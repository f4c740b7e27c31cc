// Tests for playback session control against a scripted transport.

use glam::{Mat4, Vec3};
use scene_core::{
    AudioTransport, BubbleExtra, BubbleNote, EchoExtra, EchoNote, ManualTransport, MeshKind,
    PointExtra, PointNote, RecordingRenderer, ScoreData, SessionConfig, SessionController,
};

fn score() -> ScoreData {
    ScoreData {
        echo: vec![
            EchoNote::new(0.005, 60, 1, EchoExtra {}),
            EchoNote::new(1.0, 60, 100, EchoExtra {}),
            EchoNote::new(2.0, 64, 100, EchoExtra {}),
        ],
        points: vec![PointNote::new(
            1.0,
            72,
            100,
            PointExtra {
                position: Vec3::new(0.0, 50.0, 0.0),
            },
        )],
        bubbles: vec![BubbleNote::new(1.5, 0, 100, BubbleExtra { column: 2, row: 3 })],
    }
}

fn setup() -> (SessionController, ManualTransport, RecordingRenderer) {
    (
        SessionController::new(score(), SessionConfig::default()),
        ManualTransport::new(),
        RecordingRenderer::new(),
    )
}

/// Session whose score time zero lines up with the start message.
fn setup_without_lead_in() -> (SessionController, ManualTransport, RecordingRenderer) {
    let config = SessionConfig {
        score_lead_in_sec: 0.0,
        ..SessionConfig::default()
    };
    (
        SessionController::new(score(), config),
        ManualTransport::new(),
        RecordingRenderer::new(),
    )
}

fn start(
    session: &mut SessionController,
    transport: &mut ManualTransport,
    renderer: &mut RecordingRenderer,
) {
    transport.push_message("csd:started");
    session.poll(transport, renderer);
}

#[test]
fn nothing_animates_before_playback_starts() {
    let (mut session, transport, mut renderer) = setup();
    assert!(session
        .frame(&transport, 0.016, Vec3::ZERO, &mut renderer)
        .is_none());
    assert!(session.animators().is_none());
    assert_eq!(renderer.instances(MeshKind::EchoPillar).len(), 0);
    assert_eq!(session.elapsed(&transport), 0.0);
}

#[test]
fn started_sets_start_time_and_builds_animators() {
    let (mut session, mut transport, mut renderer) = setup();
    transport.time = 10.0;
    transport.latency = 0.1;
    start(&mut session, &mut transport, &mut renderer);

    let clock = *session.clock();
    assert!(clock.is_started);
    assert!((clock.start_time - (10.0 - (4.0 - 3.0 * 0.1))).abs() < 1e-9);
    assert!(session.animators().is_some());
    assert_eq!(renderer.instances(MeshKind::EchoPillar).len(), 2 * 5 * 3);
    assert_eq!(renderer.instances(MeshKind::Bubble).len(), 900);
}

#[test]
fn late_start_message_keeps_visuals_on_the_score_clock() {
    let (mut session, mut transport, mut renderer) = setup();
    // Playback crossed the 4 s lead-in at transport 4, but the first poll is at 6.
    transport.time = 6.0;
    transport.push_message("csd:started at 6");
    session.poll(&mut transport, &mut renderer);
    assert!(session.clock().start_time.abs() < 1e-9);

    // Session time stays equal to playback time.
    transport.time = 6.1;
    assert!((session.elapsed(&transport) - 6.1).abs() < 1e-9);

    // A start message without a time is taken as arriving on the lead-in.
    let (mut session, mut transport, mut renderer) = setup();
    transport.time = 6.0;
    start(&mut session, &mut transport, &mut renderer);
    assert!((session.clock().start_time - 2.0).abs() < 1e-9);
}

#[test]
fn frame_feeds_session_time_to_every_effect() {
    let (mut session, mut transport, mut renderer) = setup_without_lead_in();
    transport.time = 10.0;
    start(&mut session, &mut transport, &mut renderer);

    let frame = session
        .frame(&transport, 0.016, Vec3::ZERO, &mut renderer)
        .unwrap();
    assert!(frame.elapsed.abs() < 1e-9);
    assert!(frame.echo.turned_on.is_empty());

    transport.time = 11.0;
    let frame = session
        .frame(&transport, 0.016, Vec3::ZERO, &mut renderer)
        .unwrap();
    assert!((frame.elapsed - 1.0).abs() < 1e-9);
    assert_eq!(frame.echo.turned_on.len(), 1);
    assert_eq!(frame.points.shown.as_slice(), &[0]);

    transport.time = 11.5;
    session.frame(&transport, 0.5, Vec3::ZERO, &mut renderer);
    let bubbles = &session.animators().unwrap().bubbles;
    assert!(bubbles.particle(2, 3).unwrap().started);
}

#[test]
fn ended_rewinds_player_and_animators() {
    let (mut session, mut transport, mut renderer) = setup_without_lead_in();
    transport.time = 10.0;
    start(&mut session, &mut transport, &mut renderer);
    transport.time = 11.1;
    session.frame(&transport, 0.016, Vec3::ZERO, &mut renderer);
    assert!(renderer.visible_count(MeshKind::EchoGlow) > 0);

    transport.push_message("csd:ended");
    session.poll(&mut transport, &mut renderer);
    assert!(!session.clock().is_started);
    assert_eq!(session.clock().restart_count, 1);
    assert_eq!(transport.rewinds, 1);
    assert_eq!(renderer.visible_count(MeshKind::EchoGlow), 0);
    assert!(session
        .frame(&transport, 0.016, Vec3::ZERO, &mut renderer)
        .is_none());

    // Setup is one-time: a second start reuses the same instances.
    let pillars = renderer.instances(MeshKind::EchoPillar).len();
    start(&mut session, &mut transport, &mut renderer);
    assert!(session.clock().is_started);
    assert_eq!(renderer.instances(MeshKind::EchoPillar).len(), pillars);
}

#[test]
fn resumed_realigns_start_time() {
    let (mut session, mut transport, mut renderer) = setup();
    start(&mut session, &mut transport, &mut renderer);

    transport.time = 50.0;
    transport.latency = 0.2;
    transport.push_message("csd:resumed at 30");
    session.poll(&mut transport, &mut renderer);
    assert!((session.clock().start_time - 18.8).abs() < 1e-9);
    assert!((session.elapsed(&transport) - 31.2).abs() < 1e-9);
}

#[test]
fn unrelated_player_output_is_ignored() {
    let (mut session, mut transport, mut renderer) = setup();
    transport.push_message("<CsoundSynthesizer>");
    transport.push_message("instr 1 compiled");
    session.poll(&mut transport, &mut renderer);
    assert!(!session.clock().is_started);
    assert!(session.animators().is_none());
    assert_eq!(transport.rewinds, 0);
}

#[test]
fn pause_freezes_animation_until_resume() {
    let (mut session, mut transport, mut renderer) = setup();
    // Pausing before playback has started does nothing.
    session.pause(&mut transport);
    assert!(!session.is_paused());

    start(&mut session, &mut transport, &mut renderer);
    session.pause(&mut transport);
    assert!(session.is_paused());
    assert!(transport.paused);
    transport.advance(10.0);
    assert_eq!(transport.current_time(), 0.0);
    assert!(session
        .frame(&transport, 0.016, Vec3::ZERO, &mut renderer)
        .is_none());

    session.resume(&mut transport);
    assert!(!transport.paused);
    assert!(session
        .frame(&transport, 0.016, Vec3::ZERO, &mut renderer)
        .is_some());
}

#[test]
fn listener_pose_is_held_until_start_and_sent_only_when_moved() {
    let (mut session, mut transport, mut renderer) = setup();
    let pose = Mat4::from_translation(Vec3::new(0.0, 2.0, 335.0));

    assert!(!session.listener_tick(&pose, &mut transport));
    assert!(transport.poses.is_empty());

    // The held pose goes out as soon as playback starts.
    start(&mut session, &mut transport, &mut renderer);
    assert_eq!(transport.poses.len(), 1);
    assert_eq!(transport.poses[0], pose.to_cols_array());

    assert!(!session.listener_tick(&pose, &mut transport));
    let nudged = Mat4::from_translation(Vec3::new(0.005, 2.0, 335.0));
    assert!(!session.listener_tick(&nudged, &mut transport));
    let moved = Mat4::from_translation(Vec3::new(1.0, 2.0, 335.0));
    assert!(session.listener_tick(&moved, &mut transport));
    assert_eq!(transport.poses.len(), 2);
}
