mod common;

use std::time::Duration;

use blazebridge_control::ControlError;
use common::{binary, next_command, preview, send_all, serve_catalog, text};
use serde_json::{json, Map};

fn catalog_fragments() -> Vec<tokio_tungstenite::tungstenite::Message> {
    vec![
        binary(0x07, 0x00, b"p1\tRainbow\np2\tFire"),
        binary(0x07, 0x04, b"p3\tColor Picker"),
    ]
}

#[tokio::test(start_paused = true)]
async fn test_hardware_config_merges_replies() {
    let (pixelblaze, mut device) = common::pixelblaze().await;

    let device_task = tokio::spawn(async move {
        assert_eq!(next_command(&mut device).await, json!({ "getConfig": true }));
        send_all(
            &mut device,
            vec![
                text(r#"{"name":"Shelf","pixelCount":300}"#),
                preview(),
                text(r#"{"activeProgram":{"activeProgramId":"p2","controls":{"sliderSpeed":0.4}}}"#),
                text("not json"),
            ],
        )
        .await;
        device
    });

    let config = pixelblaze.get_hardware_config().await.unwrap();
    assert_eq!(config.name(), Some("Shelf"));
    assert_eq!(config.pixel_count(), Some(300));
    assert_eq!(config.active_program_id(), Some("p2"));

    let _device = device_task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_get_vars() {
    let (pixelblaze, mut device) = common::pixelblaze().await;

    let device_task = tokio::spawn(async move {
        next_command(&mut device).await;
        send_all(&mut device, vec![text(r#"{"vars":{"pixels":[0,1],"speed":2}}"#)]).await;
        next_command(&mut device).await;
        send_all(&mut device, vec![text(r#"{"vars":{"speed":2}}"#)]).await;
        device
    });

    let vars = pixelblaze.get_vars().await.unwrap().unwrap();
    assert_eq!(vars.get("speed"), Some(&json!(2)));
    assert!(!pixelblaze.variable_exists("pixels").await.unwrap());

    let _device = device_task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_get_vars_malformed_reply() {
    let (pixelblaze, mut device) = common::pixelblaze().await;

    let device_task = tokio::spawn(async move {
        next_command(&mut device).await;
        send_all(&mut device, vec![text("{truncated")]).await;
        device
    });

    let result = pixelblaze.get_vars().await;
    assert!(matches!(result, Err(ControlError::MalformedReply(_))));
    // A bad reply does not take the connection down
    assert!(pixelblaze.is_connected().await);

    let _device = device_task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_get_vars_without_reply() {
    let (pixelblaze, mut device) = common::pixelblaze().await;

    let device_task = tokio::spawn(async move {
        next_command(&mut device).await;
        device
    });

    assert!(pixelblaze.get_vars().await.unwrap().is_none());

    let _device = device_task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_set_variable_sends_pixels() {
    let (pixelblaze, mut device) = common::pixelblaze().await;

    pixelblaze
        .set_variable("pixels", vec![256.0, -1.5])
        .await
        .unwrap();

    assert_eq!(
        next_command(&mut device).await,
        json!({ "setVars": { "pixels": [256.0, -1.5] } })
    );
}

#[tokio::test(start_paused = true)]
async fn test_flash_save_requires_opt_in() {
    let (mut pixelblaze, mut device) = common::pixelblaze().await;

    pixelblaze.set_control("sliderSpeed", 1.7, true).await.unwrap();
    assert_eq!(
        next_command(&mut device).await,
        json!({ "setControls": { "sliderSpeed": 1.0 } })
    );

    pixelblaze.set_data_speed(3_000_000, true).await.unwrap();
    assert_eq!(
        next_command(&mut device).await,
        json!({ "dataSpeed": 3_000_000 })
    );

    pixelblaze.enable_flash_save();
    pixelblaze.set_control("sliderSpeed", -3.0, true).await.unwrap();
    assert_eq!(
        next_command(&mut device).await,
        json!({ "setControls": { "sliderSpeed": 0.0 }, "save": true })
    );

    // Opted in, but not asked for
    pixelblaze
        .set_color_control("hsvPickerColor", [0.1, 0.2, 0.3], false)
        .await
        .unwrap();
    assert_eq!(
        next_command(&mut device).await,
        json!({ "setControls": { "hsvPickerColor": [0.1, 0.2, 0.3] } })
    );
}

#[tokio::test(start_paused = true)]
async fn test_simple_setters() {
    let (pixelblaze, mut device) = common::pixelblaze().await;

    pixelblaze.set_brightness(2.0).await.unwrap();
    assert_eq!(next_command(&mut device).await, json!({ "brightness": 1.0 }));

    pixelblaze.set_sequence_timer(15000).await.unwrap();
    assert_eq!(next_command(&mut device).await, json!({ "sequenceTimer": 15000 }));

    pixelblaze.start_sequencer().await.unwrap();
    assert_eq!(
        next_command(&mut device).await,
        json!({ "sequencerEnable": true, "runSequencer": true })
    );

    pixelblaze.stop_sequencer().await.unwrap();
    assert_eq!(
        next_command(&mut device).await,
        json!({ "sequencerEnable": false, "runSequencer": false })
    );
}

#[tokio::test(start_paused = true)]
async fn test_set_active_pattern_by_name() {
    let (pixelblaze, mut device) = common::pixelblaze().await;

    let device_task = tokio::spawn(async move {
        serve_catalog(&mut device, catalog_fragments()).await;
        let command = next_command(&mut device).await;
        serve_catalog(&mut device, catalog_fragments()).await;
        (device, command)
    });

    assert!(pixelblaze.set_active_pattern("Fire").await.unwrap());
    assert!(!pixelblaze.set_active_pattern("Nope").await.unwrap());

    let (_device, command) = device_task.await.unwrap();
    assert_eq!(command, json!({ "activeProgramId": "p2" }));
}

#[tokio::test(start_paused = true)]
async fn test_get_controls_for_named_pattern() {
    let (pixelblaze, mut device) = common::pixelblaze().await;

    let device_task = tokio::spawn(async move {
        serve_catalog(&mut device, catalog_fragments()).await;
        assert_eq!(next_command(&mut device).await, json!({ "getControls": "p3" }));
        send_all(
            &mut device,
            vec![text(
                r#"{"controls":{"p3":{"rgbPickerMain":[1,0,0],"hsvPickerAccent":[0.5,1,1],"sliderSpeed":0.2}}}"#,
            )],
        )
        .await;
        device
    });

    let controls = pixelblaze
        .get_controls(Some("Color Picker"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(controls.len(), 3);
    assert_eq!(controls.get("sliderSpeed"), Some(&json!(0.2)));

    let _device = device_task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_color_control_name_prefers_hsv() {
    let (pixelblaze, mut device) = common::pixelblaze().await;

    let device_task = tokio::spawn(async move {
        next_command(&mut device).await;
        send_all(
            &mut device,
            vec![text(
                r#"{"activeProgram":{"activeProgramId":"p3","controls":{"rgbPickerMain":[1,0,0],"hsvPickerAccent":[0.5,1,1]}}}"#,
            )],
        )
        .await;
        device
    });

    let name = pixelblaze.get_color_control_name(None).await.unwrap();
    assert_eq!(name.as_deref(), Some("hsvPickerAccent"));

    let _device = device_task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_controls_of_unknown_pattern() {
    let (pixelblaze, mut device) = common::pixelblaze().await;

    let device_task = tokio::spawn(async move {
        serve_catalog(&mut device, catalog_fragments()).await;
        device
    });

    assert!(pixelblaze.get_controls(Some("Missing")).await.unwrap().is_none());

    let _device = device_task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_empty_queue() {
    let (pixelblaze, mut device) = common::pixelblaze().await;

    let device_task = tokio::spawn(async move {
        assert_eq!(next_command(&mut device).await, json!({ "ping": true }));
        send_all(&mut device, vec![preview(), text(r#"{"ack":1}"#)]).await;
        next_command(&mut device).await;
        device
    });

    let wait = Duration::from_millis(500);
    assert!(pixelblaze.wait_for_empty_queue(wait).await.unwrap());
    assert!(!pixelblaze.wait_for_empty_queue(wait).await.unwrap());

    let _device = device_task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_set_vars_object() {
    let (pixelblaze, mut device) = common::pixelblaze().await;

    let mut vars = Map::new();
    vars.insert("speed".to_string(), json!(0.5));
    vars.insert("mode".to_string(), json!(2));
    pixelblaze.set_vars(&vars).await.unwrap();

    assert_eq!(
        next_command(&mut device).await,
        json!({ "setVars": { "speed": 0.5, "mode": 2 } })
    );
}
