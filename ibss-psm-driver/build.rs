use std::collections::HashMap;
use std::env;
use std::fmt::Write;
use std::path::PathBuf;

fn main() {
    // (Variable, Type, Default value)
    let mut const_config: HashMap<&str, (&str, &str)> = HashMap::from([
        ("TX_QUEUE_CAPACITY", ("usize", "16")),
        ("ATIM_QUEUE_CAPACITY", ("usize", "16")),
        ("RX_QUEUE_CAPACITY", ("usize", "8")),
        ("AWAKE_NODES_CAPACITY", ("usize", "32")),
        ("NEXT_HOP_CAPACITY", ("usize", "16")),
        ("EVENT_QUEUE_CAPACITY", ("usize", "32")),
        ("MAX_MPDU_LEN", ("usize", "1600")),
    ]);

    // Make sure we get rerun if needed
    println!("cargo:rerun-if-changed=build.rs");
    for name in const_config.keys() {
        println!("cargo:rerun-if-env-changed=IBSS_PSM_{name}");
    }

    // Collect environment variables
    let mut data = String::new();

    for (var, value) in std::env::vars() {
        if let Some(name) = var.strip_prefix("IBSS_PSM_") {
            // discard from hashmap as a way of consuming the setting
            let Some((_, (ty, _))) = const_config.remove_entry(name) else {
                panic!("Wrong configuration name {name}");
            };

            writeln!(data, "pub const {name}: {ty} = {value};").unwrap();
        }
    }

    // Take the remaining configs and write the default value to the file
    for (name, (ty, value)) in const_config.iter() {
        writeln!(data, "pub const {name}: {ty} = {value};").unwrap();
    }

    let out_dir = PathBuf::from(env::var_os("OUT_DIR").unwrap());
    let out_file = out_dir.join("config.rs");
    std::fs::write(out_file, data).unwrap();
}
