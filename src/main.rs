// Prevents additional console window on Windows in release, DO NOT REMOVE!!
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

fn main() {
    // Load .env file if present (e.g. KEYDISPLAY_SETTINGS during development)
    // Silently ignore if not found
    let _ = dotenvy::dotenv();

    keydisplay_lib::run();
}
