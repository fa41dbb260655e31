fn main() {
    #[cfg(feature = "tray")]
    tauri_build::build()
}
