use std::env;

fn main() {
    // Build-time defaults for the BLE control channel.
    // Read by `config::NearbyConfig::from_build_env()`.

    // Advertised device name
    if let Ok(name) = env::var("NEARBY_DEVICE_NAME") {
        println!("cargo:rustc-env=NEARBY_DEVICE_NAME={}", name);
        println!("cargo:warning=Using NEARBY_DEVICE_NAME from environment: {}", name);
    } else {
        println!("cargo:rustc-env=NEARBY_DEVICE_NAME=UWB Accessory");
    }

    // Bounded wait (scheduler ticks) for task-context registry access
    if let Ok(ticks) = env::var("NEARBY_LOCK_TIMEOUT_TICKS") {
        println!("cargo:rustc-env=NEARBY_LOCK_TIMEOUT_TICKS={}", ticks);
        println!(
            "cargo:warning=Using NEARBY_LOCK_TIMEOUT_TICKS from environment: {}",
            ticks
        );
    } else {
        println!("cargo:rustc-env=NEARBY_LOCK_TIMEOUT_TICKS=100");
    }

    println!("cargo:rerun-if-env-changed=NEARBY_DEVICE_NAME");
    println!("cargo:rerun-if-env-changed=NEARBY_LOCK_TIMEOUT_TICKS");
}
