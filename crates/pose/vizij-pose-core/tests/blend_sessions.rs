use vizij_pose_core::math::len4;
use vizij_pose_core::*;

const RIG: ObjectId = ObjectId(1);

fn approx(a: f32, b: f32, eps: f32) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

fn rig_scene() -> Scene {
    let json = vizij_test_fixtures::scenes::json("slide-rig").expect("load slide-rig fixture");
    parse_scene_json(&json).expect("parse slide-rig fixture")
}

fn wave() -> Action {
    let json = vizij_test_fixtures::poses::json("wave").expect("load wave pose");
    parse_action_json(&json).expect("parse wave pose")
}

fn arm_x(scene: &Scene) -> f32 {
    scene.bone(RIG, "Arm").unwrap().location[0]
}

fn blend(scene: &Scene, options: &BlendOptions, gesture: &GestureContext, locks: &EvalLocks) -> BlendSession {
    BlendSession::init(scene, wave(), options, gesture, locks).expect("blend init")
}

fn at(factor: f32) -> BlendOptions {
    BlendOptions {
        blend_factor: factor,
        ..BlendOptions::default()
    }
}

#[test]
fn blends_selected_bones_at_the_factor() {
    let mut scene = rig_scene();
    let locks = EvalLocks::new();
    let session = blend(&scene, &at(0.5), &GestureContext::default(), &locks);
    assert_eq!(session.bones(), ["Hand.L".to_string(), "Arm".to_string()]);
    assert_eq!(session.object(), RIG);

    session.apply(&mut scene);
    approx(arm_x(&scene), 5.5, 1e-5);
    let hand = scene.bone(RIG, "Hand.L").unwrap();
    approx(hand.location[0], 0.2, 1e-5);
    let Rotation::Quaternion(q) = hand.rotation else {
        panic!("Hand.L should keep quaternion rotation");
    };
    approx(len4(q), 1.0, 1e-5);
    // 45° -> 90° about z, halfway.
    let half = (3.0 * std::f32::consts::PI / 16.0).cos();
    approx(q[0], half, 1e-4);
}

#[test]
fn tab_shows_the_original_pose() {
    let mut scene = rig_scene();
    let before = scene.clone();
    let locks = EvalLocks::new();
    let mut keyframer = ActionKeyframer::default();
    let mut session = blend(&scene, &at(1.0), &GestureContext::default(), &locks);
    session.apply(&mut scene);
    approx(arm_x(&scene), 3.0, 1e-5);

    session.handle_event(&mut scene, &mut keyframer, &InputEvent::press(Key::Tab));
    assert_eq!(session.state(), BlendState::Original);
    assert_eq!(scene, before);
    assert!(session.status_text().contains("showing original"));

    session.handle_event(&mut scene, &mut keyframer, &InputEvent::press(Key::Tab));
    assert_eq!(session.state(), BlendState::Blending);
    approx(arm_x(&scene), 3.0, 1e-5);
}

#[test]
fn pointer_position_sets_the_factor() {
    let mut scene = rig_scene();
    let locks = EvalLocks::new();
    let mut keyframer = ActionKeyframer::default();
    let gesture = GestureContext {
        region_xmin: 100.0,
        region_width: 400.0,
        cursor_x: 250.0,
        initiating_key: None,
    };
    let mut session = blend(&scene, &at(1.0), &gesture, &locks);

    session.handle_event(&mut scene, &mut keyframer, &InputEvent::pointer(300.0));
    approx(session.factor(), 0.5, 1e-6);
    approx(arm_x(&scene), 5.5, 1e-5);
    assert_eq!(session.status_text(), "Blend Pose 'wave': 50% | Tab: toggle original");

    session.handle_event(&mut scene, &mut keyframer, &InputEvent::pointer(900.0));
    assert_eq!(session.factor(), 1.0);
    session.handle_event(&mut scene, &mut keyframer, &InputEvent::pointer(0.0));
    assert_eq!(session.factor(), 0.0);
}

#[test]
fn releasing_the_initiating_button_confirms() {
    let mut scene = rig_scene();
    let locks = EvalLocks::new();
    let mut keyframer = ActionKeyframer::default();
    let options = BlendOptions {
        blend_factor: 0.0,
        release_confirm: true,
        ..BlendOptions::default()
    };
    let gesture = GestureContext {
        cursor_x: 200.0,
        initiating_key: Some(Key::LeftMouse),
        ..GestureContext::default()
    };
    let mut session = blend(&scene, &options, &gesture, &locks);

    // Drag is measured from where the gesture started.
    session.handle_event(&mut scene, &mut keyframer, &InputEvent::pointer(400.0));
    approx(session.factor(), 0.2, 1e-6);

    let other = session.handle_event(&mut scene, &mut keyframer, &InputEvent::release(Key::RightMouse));
    assert!(other.is_running());

    let status = session.handle_event(&mut scene, &mut keyframer, &InputEvent::release(Key::LeftMouse));
    assert_eq!(status, SessionStatus::Finished(SessionOutcome::Confirmed));
    assert_eq!(session.state(), BlendState::Confirmed);
    approx(arm_x(&scene), 7.0, 1e-5);
    assert!(!locks.is_locked(RIG));

    let action = scene.object(RIG).unwrap().action.as_ref().unwrap();
    let curve = action
        .find_curve(&CurvePath::new("Arm", ChannelProperty::Location), 0)
        .unwrap();
    let keyed = curve.key_index_at(10.0, 0.01).expect("key at the current frame");
    approx(curve.keys[keyed].value, 7.0, 1e-5);
    // Hand.L had no location curve; keying creates it.
    assert!(action
        .find_curve(&CurvePath::new("Hand.L", ChannelProperty::Location), 0)
        .is_some());
}

#[test]
fn flipped_pose_targets_the_mirrored_bones() {
    let mut scene = rig_scene();
    let locks = EvalLocks::new();
    let options = BlendOptions {
        flipped: true,
        ..BlendOptions::default()
    };
    let session = blend(&scene, &options, &GestureContext::default(), &locks);
    // Hand.R exists but isn't selected.
    assert_eq!(session.bones(), ["Arm".to_string()]);
    session.apply(&mut scene);
    approx(arm_x(&scene), -3.0, 1e-5);
}

#[test]
fn linked_action_is_posed_but_not_keyed() {
    let mut scene = rig_scene();
    if let Some(action) = scene.object_mut(RIG).unwrap().action.as_mut() {
        action.linked = true;
    }
    let before = scene.object(RIG).unwrap().action.clone();
    let locks = EvalLocks::new();
    let mut keyframer = ActionKeyframer::default();
    let mut session = blend(&scene, &at(1.0), &GestureContext::default(), &locks);
    session.apply(&mut scene);
    session.confirm(&mut scene, &mut keyframer);

    approx(arm_x(&scene), 3.0, 1e-5);
    assert_eq!(scene.object(RIG).unwrap().action, before);
}

#[test]
fn cancel_restores_and_unlocks() {
    let mut scene = rig_scene();
    let before = scene.clone();
    let locks = EvalLocks::new();
    let mut keyframer = ActionKeyframer::default();
    let mut session = blend(&scene, &at(0.7), &GestureContext::default(), &locks);
    session.apply(&mut scene);

    let status = session.handle_event(&mut scene, &mut keyframer, &InputEvent::press(Key::RightMouse));
    assert_eq!(status, SessionStatus::Finished(SessionOutcome::Cancelled));
    assert_eq!(scene, before);
    assert_eq!(locks.locked_count(), 0);
}

#[test]
fn init_preconditions() {
    let locks = EvalLocks::new();
    let gesture = GestureContext::default();
    let options = BlendOptions::default();

    let mut scene = rig_scene();
    scene.active_object = None;
    assert_eq!(
        BlendSession::init(&scene, wave(), &options, &gesture, &locks).unwrap_err(),
        PoseError::NoPoseContext
    );

    let mut scene = rig_scene();
    scene.object_mut(RIG).unwrap().linked = true;
    assert!(matches!(
        BlendSession::init(&scene, wave(), &options, &gesture, &locks),
        Err(PoseError::LinkedData { .. })
    ));

    let scene = rig_scene();
    let stranger = Action::new("stranger").with_curve(
        FCurve::new(CurvePath::new("Tail", ChannelProperty::Location), 0).with_keys(vec![Keyframe::new(1.0, 1.0)]),
    );
    assert_eq!(
        BlendSession::init(&scene, stranger, &options, &gesture, &locks).unwrap_err(),
        PoseError::NoAnimatedBones
    );

    let _held = locks.try_lock(RIG, "Rig").unwrap();
    assert!(matches!(
        BlendSession::init(&scene, wave(), &options, &gesture, &locks),
        Err(PoseError::ObjectBusy { .. })
    ));
}

#[test]
fn unselected_rig_blends_every_pose_bone() {
    let mut scene = rig_scene();
    for bone in &mut scene.object_mut(RIG).unwrap().pose.bones {
        bone.selected = false;
    }
    let session = blend(&scene, &at(1.0), &GestureContext::default(), &EvalLocks::new());
    assert_eq!(session.bones().len(), 2);
}
