fn main() {
    for key in [
        "WIFI_SSID",
        "WIFI_PASS",
        "PROVISION_URL",
        "PING_URL",
        "PROVISION_API_KEY",
        "PING_INTERVAL_MS",
        "ENDPOINT_PROFILE",
    ] {
        println!("cargo:rerun-if-env-changed={key}");
    }

    if std::env::var("CARGO_FEATURE_ESP32").is_ok() {
        embuild::espidf::sysenv::output();
    }
}
