use std::fs;

const DEFAULT_CONFIG: &str = "src/default_config.toml";
const STYLESHEET: &str = "src/report.css";

const SECTIONS: [&str; 4] = ["document", "page", "font", "links"];
const SLOTS: [&str; 4] = [
    "{{running-header}}",
    "{{page-footer}}",
    "{{link-color}}",
    "{{link-decoration}}",
];

fn main() {
    // Both files are embedded with include_str!; catch mistakes at build time
    println!("cargo:rerun-if-changed={DEFAULT_CONFIG}");
    println!("cargo:rerun-if-changed={STYLESHEET}");

    let config = read(DEFAULT_CONFIG);
    let table = match config.parse::<toml::Table>() {
        Ok(table) => table,
        Err(e) => panic!("{DEFAULT_CONFIG} is not valid TOML: {e}"),
    };
    for section in SECTIONS {
        if !table.get(section).is_some_and(toml::Value::is_table) {
            panic!("{DEFAULT_CONFIG} is missing the [{section}] table");
        }
    }

    let css = read(STYLESHEET);
    for slot in SLOTS {
        if !css.contains(slot) {
            panic!("{STYLESHEET} is missing the {slot} slot");
        }
    }
}

fn read(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("Failed to read {path}: {e}"))
}
