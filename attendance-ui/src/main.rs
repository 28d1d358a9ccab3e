//! School Attendance Dashboard
//!
//! Leptos (WASM) front end for the attendance API.
//!
//! # Features
//!
//! - Role-gated screens for administrators, teachers and parents
//! - Live attendance mirrors over WebSocket
//! - Reports with charts and spreadsheet export
//! - Vietnamese and English interface, theme and display preferences
//!
//! # Architecture
//!
//! Client-side rendered (CSR) Leptos application compiled to WebAssembly.
//! It talks to the attendance API over HTTP and WebSocket.

use leptos::*;

mod api;
mod app;
mod components;
mod pages;
mod state;

fn main() {
    console_error_panic_hook::set_once();
    mount_to_body(|| view! { <app::App /> });
}
