// Prevents additional console window on Windows in release, DO NOT REMOVE!!
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

fn main() {
    m3u8_grabber_lib::logging::init(false);
    m3u8_grabber_lib::gui::run()
}
