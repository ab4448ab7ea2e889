// Integration tests for the subsystem clients using wiremock.
#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cresctl_api::subsystem::outputs::{DEFAULT_OUTPUTS, DEFAULT_PWM_OUTPUTS};
use cresctl_api::subsystem::switches::{DEFAULT_PWM_SWITCHES, DEFAULT_SWITCHES};
use cresctl_api::{
    CresClient, Error, Fan, FanState, Inputs, Outputs, PwmState, Sensors, Subsystem, SwitchState,
    Switches, System, Value,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, CresClient) {
    let server = MockServer::start().await;
    let client = CresClient::with_client(reqwest::Client::new(), &server.uri()).unwrap();
    (server, client)
}

async fn answer(server: &MockServer, query: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path("/command"))
        .and(query_param("query", query))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

// ── Fan ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fan_fetch_all() {
    let (server, client) = setup().await;
    answer(
        &server,
        "fan:enabled;fan:duty-cycle;fan:duty-cycle-min",
        "1;40.0;20.0",
    )
    .await;

    let mut fan = Fan::new(client);
    fan.fetch_all().await.unwrap();

    assert_eq!(
        fan.state(),
        FanState {
            enabled: true,
            duty_cycle: 40.0,
            duty_cycle_min: 20.0,
        }
    );
}

#[tokio::test]
async fn test_fan_disable_forces_zero_duty() {
    let (server, client) = setup().await;
    answer(
        &server,
        "fan:enabled;fan:duty-cycle;fan:duty-cycle-min",
        "1;75.0;20.0",
    )
    .await;
    answer(&server, "fan:enabled=0", "0").await;
    answer(&server, "fan:duty-cycle=0", "0").await;

    let mut fan = Fan::new(client);
    fan.fetch_all().await.unwrap();
    let confirmed = fan.set_enabled(false).await.unwrap();

    assert!(!confirmed);
    let state = fan.state();
    assert!(!state.enabled);
    assert_eq!(state.duty_cycle, 0.0);
    assert_eq!(state.duty_cycle_min, 20.0);
}

#[tokio::test]
async fn test_fan_generic_disable_write_zeroes_duty() {
    let (server, client) = setup().await;
    answer(
        &server,
        "fan:enabled;fan:duty-cycle;fan:duty-cycle-min",
        "1;75.0;20.0",
    )
    .await;
    answer(&server, "fan:enabled=0", "0").await;
    answer(&server, "fan:duty-cycle=0", "0").await;

    let mut fan = Fan::new(client);
    fan.fetch_all().await.unwrap();
    let confirmed = fan
        .set_one("fan", "enabled", Value::Bool(false))
        .await
        .unwrap();

    assert_eq!(confirmed, Value::Bool(false));
    assert_eq!(fan.state().duty_cycle, 0.0);
}

#[tokio::test]
async fn test_fan_enable_writes_once() {
    let (server, client) = setup().await;
    answer(&server, "fan:enabled=1", "1").await;

    let mut fan = Fan::new(client);
    assert!(fan.set_enabled(true).await.unwrap());

    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_fan_apply_all_batches_writes() {
    let (server, client) = setup().await;
    answer(
        &server,
        "fan:enabled=0;fan:duty-cycle=0;fan:duty-cycle-min=15",
        "0;0;15",
    )
    .await;

    let mut fan = Fan::new(client);
    let confirmed = fan
        .apply_all(FanState {
            enabled: false,
            duty_cycle: 60.0,
            duty_cycle_min: 15.0,
        })
        .await
        .unwrap();

    assert_eq!(confirmed.duty_cycle, 0.0);
    assert_eq!(fan.state().duty_cycle_min, 15.0);
}

// ── Switches / Outputs / Inputs ─────────────────────────────────────

#[tokio::test]
async fn test_switches_fetch_all_default_set() {
    let (server, client) = setup().await;
    answer(
        &server,
        "switch-12v:enabled;switch-12v:pwm-enabled;\
         switch-12v:duty-cycle;switch-12v:pwm-frequency;\
         switch-24v-a:enabled;switch-24v-a:pwm-enabled;\
         switch-24v-a:duty-cycle;switch-24v-a:pwm-frequency;\
         switch-24v-b:enabled;switch-24v-b:pwm-enabled;\
         switch-24v-b:duty-cycle;switch-24v-b:pwm-frequency",
        "1;0;50.0;0.0;0;0;0.0;0.0;1;1;30.0;200.0",
    )
    .await;

    let mut switches = Switches::new(client, &DEFAULT_SWITCHES, &DEFAULT_PWM_SWITCHES);
    switches.fetch_all().await.unwrap();

    assert_eq!(
        switches.state("24v-b").unwrap(),
        SwitchState {
            enabled: true,
            duty_cycle: 30.0,
            pwm: Some(PwmState {
                enabled: true,
                frequency: 200.0,
            }),
        }
    );
    assert!(!switches.state("24v-a").unwrap().enabled);
    let attrs = switches.attributes();
    assert_eq!(attrs[0].0, "12v");
    assert_eq!(attrs[0].1["duty-cycle"], Value::Float(50.0));
}

#[tokio::test]
async fn test_outputs_count_mismatch_keeps_previous_cache() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/command"))
        .respond_with(ResponseTemplate::new(200).set_body_string("1;2.5;0;1"))
        .mount(&server)
        .await;

    let mut outputs = Outputs::new(client, &DEFAULT_OUTPUTS, &DEFAULT_PWM_OUTPUTS);
    let before = outputs.state("a").unwrap();
    let err = outputs.fetch_all().await.unwrap_err();

    assert!(matches!(
        err,
        Error::FieldCountMismatch {
            expected: 34,
            actual: 4,
            ..
        }
    ));
    assert_eq!(outputs.state("a").unwrap(), before);
}

#[tokio::test]
async fn test_outputs_write_with_malformed_echo_still_caches() {
    let (server, client) = setup().await;
    answer(&server, "out-a:voltage=6.5", "").await;

    let mut outputs = Outputs::new(client, &DEFAULT_OUTPUTS, &DEFAULT_PWM_OUTPUTS);
    let err = outputs.set_voltage("a", 6.5).await.unwrap_err();

    assert!(matches!(err, Error::Type { .. }));
    assert_eq!(outputs.state("a").unwrap().voltage, 6.5);
}

#[tokio::test]
async fn test_outputs_pwm_write_on_non_pwm_output_is_rejected() {
    let (server, client) = setup().await;
    let mut outputs = Outputs::new(client, &DEFAULT_OUTPUTS, &DEFAULT_PWM_OUTPUTS);

    let err = outputs.set_pwm_enabled("c", true).await.unwrap_err();

    assert!(matches!(err, Error::UnknownField { .. }));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_input_voltage_is_read_only() {
    let (server, client) = setup().await;
    let mut inputs = Inputs::new(client, &["a", "b"]);

    let err = inputs
        .set_one("a", "voltage", Value::Float(1.0))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ReadOnlyField { ref field } if field == "in-a:voltage"));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_instance() {
    let (_server, client) = setup().await;
    let mut inputs = Inputs::new(client, &["a", "b"]);

    let err = inputs.voltage("z").await.unwrap_err();

    assert!(matches!(err, Error::UnknownInstance { ref instance, .. } if instance == "z"));
}

#[tokio::test]
async fn test_input_calibration_write_updates_cache() {
    let (server, client) = setup().await;
    answer(&server, "in-b:calib-offset=0.25", "0.25").await;

    let mut inputs = Inputs::new(client, &["a", "b"]);
    let confirmed = inputs.set_calib_offset("b", 0.25).await.unwrap();

    assert_eq!(confirmed, 0.25);
    assert_eq!(inputs.state("b").unwrap().calib_offset, 0.25);
}

// ── Sensors ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_sensor_discovery_empty_list() {
    let (server, client) = setup().await;
    answer(&server, "extension:get-all()", "[]").await;

    let mut sensors = Sensors::new(client);
    let ids = sensors.discover().await.unwrap();
    sensors.fetch_all().await.unwrap();

    assert!(ids.is_empty());
    assert!(sensors.attributes().is_empty());
}

#[tokio::test]
async fn test_sensor_discovery_and_fetch() {
    let (server, client) = setup().await;
    answer(&server, "extension:get-all()", r#"["sht-21","scd-co2"]"#).await;
    answer(
        &server,
        "extension:sht-21:humidity;extension:sht-21:temperature;extension:sht-21:vpd",
        "55.2;24.1;1.3",
    )
    .await;
    answer(
        &server,
        "extension:scd-co2:humidity;extension:scd-co2:temperature;\
         extension:scd-co2:vpd;extension:scd-co2:co2-concentration",
        "50.0;;1.1;640",
    )
    .await;

    let mut sensors = Sensors::new(client);
    sensors.discover().await.unwrap();
    sensors.fetch_all().await.unwrap();

    assert_eq!(sensors.ids(), vec!["sht-21", "scd-co2"]);
    let co2 = sensors.reading("scd-co2").unwrap();
    assert_eq!(co2.co2_concentration, Some(640.0));
    assert_eq!(co2.temperature, None);
    assert_eq!(sensors.reading("sht-21").unwrap().co2_concentration, None);
}

// ── Protocol errors ─────────────────────────────────────────────────

#[tokio::test]
async fn test_device_error_body() {
    let (server, client) = setup().await;
    answer(&server, "fan:enabled", "ERROR: unknown command").await;

    let mut fan = Fan::new(client);
    let err = fan.enabled().await.unwrap_err();

    assert!(matches!(err, Error::DeviceError { .. }));
    assert!(err.is_protocol());
}

#[tokio::test]
async fn test_http_error_status() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client.query("fan:enabled").await.unwrap_err();

    assert!(matches!(err, Error::Http { status: 500 }));
}

#[tokio::test]
async fn test_unsupported_content_type() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"))
        .mount(&server)
        .await;

    let err = client.query("fan:enabled").await.unwrap_err();

    assert!(matches!(err, Error::UnsupportedContentType { .. }));
}

#[tokio::test]
async fn test_connection_refused() {
    let client = CresClient::with_client(reqwest::Client::new(), "127.0.0.1:1").unwrap();

    let err = client.query("type").await.unwrap_err();

    assert!(err.is_connection());
}

// ── System ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_connection_check_empty_body() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(query_param("query", "type"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    assert!(!System::new(client).test_connection().await);
}

#[tokio::test]
async fn test_connection_check_device_type() {
    let (server, client) = setup().await;
    answer(&server, "type", "CresControl Pro").await;

    let system = System::new(client);

    assert!(system.test_connection().await);
}

#[tokio::test]
async fn test_system_fetch_all() {
    let (server, client) = setup().await;
    answer(
        &server,
        "system:cpu-id;system:reset-cause;system:frequency;system:rescue-mode;\
         system:debugging-enabled;system:heap:size;system:heap:free;system:heap:largest-block;\
         system:heap:watermark;system:serial:enabled;system:serial:baudrate",
        "a1b2c3;power-on;240MHz;0;1;327680;120000;65536;90000;1;115200",
    )
    .await;

    let mut system = System::new(client);
    system.fetch_all().await.unwrap();
    let info = system.info();

    assert_eq!(info.cpu_id, "a1b2c3");
    assert_eq!(info.frequency, "240MHz");
    assert!(info.debugging_enabled);
    assert_eq!(info.serial_baudrate, 115_200.0);
}
