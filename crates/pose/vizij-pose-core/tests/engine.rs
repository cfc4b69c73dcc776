use std::cell::RefCell;
use std::rc::Rc;

use vizij_pose_core::*;

const RIG: ObjectId = ObjectId(1);

fn approx(a: f32, b: f32, eps: f32) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

fn engine() -> PoseEngine {
    let json = vizij_test_fixtures::scenes::json("slide-rig").expect("load slide-rig fixture");
    let scene = parse_scene_json(&json).expect("parse slide-rig fixture");
    PoseEngine::new(scene, Config::default())
}

fn library() -> Rc<RefCell<InMemoryLibrary>> {
    let json = vizij_test_fixtures::poses::json("wave").expect("load wave pose");
    let mut lib = InMemoryLibrary::new();
    lib.insert("wave", parse_action_json(&json).expect("parse wave pose"));
    Rc::new(RefCell::new(lib))
}

fn arm_x(engine: &PoseEngine) -> f32 {
    engine.scene().bone(RIG, "Arm").unwrap().location[0]
}

#[test]
fn slide_session_lifecycle() {
    let mut eng = engine();
    let options = SlideOptions {
        percentage: 0.1,
        ..SlideOptions::default()
    };
    let handle = eng
        .start_slide(SlideMode::Push, &options, &GestureContext::default())
        .unwrap();
    assert!(eng.is_active(handle));
    // Applied once on start.
    approx(arm_x(&eng), 8.6, 1e-4);
    assert_eq!(eng.status_text(handle), "Push Pose: 10% | Channels: All");
    assert_eq!(eng.slide_session(handle).unwrap().frames(), (0, 20));
    assert!(eng.blend_session(handle).is_none());

    let status = eng.feed_event(handle, &InputEvent::press(Key::Enter));
    assert_eq!(status, SessionStatus::Finished(SessionOutcome::Confirmed));
    assert!(!eng.is_active(handle));
    assert_eq!(eng.active_sessions(), 0);
    assert_eq!(eng.locks().locked_count(), 0);
}

#[test]
fn handles_are_not_reused() {
    let mut eng = engine();
    let gesture = GestureContext::default();
    let first = eng.start_slide(SlideMode::Relax, &SlideOptions::default(), &gesture).unwrap();
    eng.cancel(first);
    let second = eng.start_slide(SlideMode::Relax, &SlideOptions::default(), &gesture).unwrap();
    assert_ne!(first, second);
    assert!(!eng.is_active(first));
    assert!(eng.is_active(second));
}

#[test]
fn one_session_per_object() {
    let mut eng = engine();
    let gesture = GestureContext::default();
    let slide = eng.start_slide(SlideMode::Push, &SlideOptions::default(), &gesture).unwrap();
    let before = eng.scene().clone();

    let err = eng
        .start_blend(PoseSource::Action(Action::new("empty")), &BlendOptions::default(), &gesture)
        .unwrap_err();
    assert_eq!(err, PoseError::NoAnimatedBones);

    let lib = library();
    eng.set_library(Box::new(lib.clone()));
    let err = eng
        .start_blend(PoseSource::Asset("wave".into()), &BlendOptions::default(), &gesture)
        .unwrap_err();
    assert!(matches!(err, PoseError::ObjectBusy { .. }));
    // The failed start gives the asset back and leaves the pose alone.
    assert_eq!(lib.borrow().lease_count("wave"), 0);
    assert_eq!(eng.scene(), &before);

    eng.cancel(slide);
    assert!(eng
        .start_blend(PoseSource::Asset("wave".into()), &BlendOptions::default(), &gesture)
        .is_ok());
}

#[test]
fn asset_blend_holds_its_lease_until_finished() {
    let mut eng = engine();
    let lib = library();
    eng.set_library(Box::new(lib.clone()));

    let options = BlendOptions {
        blend_factor: 0.5,
        ..BlendOptions::default()
    };
    let handle = eng
        .start_blend(PoseSource::Asset("wave".into()), &options, &GestureContext::default())
        .unwrap();
    assert_eq!(lib.borrow().lease_count("wave"), 1);
    approx(arm_x(&eng), 5.5, 1e-5);
    assert_eq!(eng.blend_session(handle).unwrap().factor(), 0.5);

    let status = eng.feed_event(handle, &InputEvent::press(Key::Escape));
    assert_eq!(status, SessionStatus::Finished(SessionOutcome::Cancelled));
    assert_eq!(lib.borrow().lease_count("wave"), 0);
    approx(arm_x(&eng), 8.0, 1e-6);
}

#[test]
fn missing_asset_is_reported() {
    let mut eng = engine();
    eng.set_library(Box::new(library()));
    let err = eng.apply_pose(PoseSource::Asset("jump".into())).unwrap_err();
    assert_eq!(err, PoseError::AssetUnavailable { name: "jump".into() });
    assert_eq!(err.status_message(), "Pose asset 'jump' could not be loaded");
}

#[test]
fn apply_pose_keys_the_full_pose() {
    let mut eng = engine();
    let lib = library();
    eng.set_library(Box::new(lib.clone()));
    eng.apply_pose(PoseSource::Asset("wave".into())).unwrap();

    approx(arm_x(&eng), 3.0, 1e-5);
    assert_eq!(lib.borrow().lease_count("wave"), 0);
    let action = eng.scene().object(RIG).unwrap().action.as_ref().unwrap();
    let curve = action
        .find_curve(&CurvePath::new("Arm", ChannelProperty::Location), 0)
        .unwrap();
    assert!(curve.key_index_at(10.0, 0.01).is_some());
}

#[test]
fn disabled_auto_key_leaves_curves() {
    let mut eng = engine();
    eng.set_keyframer(Box::new(ActionKeyframer::new(false)));
    let before = eng.scene().object(RIG).unwrap().action.clone();
    let options = SlideOptions {
        percentage: 1.0,
        ..SlideOptions::default()
    };
    eng.exec_slide(SlideMode::Breakdown, &options).unwrap();
    approx(arm_x(&eng), 10.0, 1e-5);
    assert_eq!(eng.scene().object(RIG).unwrap().action, before);
}

#[test]
fn playhead_moves_between_operations() {
    let mut eng = engine();
    eng.scene_mut().current_frame = 5.0;
    let options = SlideOptions {
        percentage: 0.0,
        ..SlideOptions::default()
    };
    eng.exec_slide(SlideMode::Breakdown, &options).unwrap();
    approx(arm_x(&eng), 0.0, 1e-5);

    // Keyed at 5 by the slide; propagate from there.
    let written = eng
        .propagate(&PropagateOptions {
            mode: PropagateMode::NextKey,
            ..PropagateOptions::default()
        })
        .unwrap();
    assert!(written > 0);
}

#[test]
fn propagate_waits_for_live_sessions() {
    let mut eng = engine();
    let arm_x_keys = |eng: &PoseEngine| -> Vec<(f32, f32)> {
        let action = eng.scene().object(RIG).unwrap().action.as_ref().unwrap();
        action
            .find_curve(&CurvePath::new("Arm", ChannelProperty::Location), 0)
            .unwrap()
            .keys
            .iter()
            .map(|k| (k.frame, k.value))
            .collect()
    };
    let options = SlideOptions {
        percentage: 0.1,
        ..SlideOptions::default()
    };
    let handle = eng
        .start_slide(SlideMode::Push, &options, &GestureContext::default())
        .unwrap();
    approx(arm_x(&eng), 8.6, 1e-4);

    let before = arm_x_keys(&eng);
    let to_end = PropagateOptions {
        mode: PropagateMode::BeforeEnd,
        ..PropagateOptions::default()
    };
    let err = eng.propagate(&to_end).unwrap_err();
    assert!(matches!(err, PoseError::ObjectBusy { .. }));
    assert_eq!(arm_x_keys(&eng), before);
    assert!(eng.is_active(handle));

    eng.cancel(handle);
    approx(arm_x(&eng), 8.0, 1e-6);
    assert_eq!(arm_x_keys(&eng), vec![(0.0, 0.0), (20.0, 10.0)]);
    assert!(eng.propagate(&to_end).unwrap() > 0);
}

#[test]
#[should_panic(expected = "unknown or finished session")]
fn finished_handle_panics() {
    let mut eng = engine();
    let handle = eng
        .start_slide(SlideMode::Push, &SlideOptions::default(), &GestureContext::default())
        .unwrap();
    eng.cancel(handle);
    eng.feed_event(handle, &InputEvent::pointer(10.0));
}
