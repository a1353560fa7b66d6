//! Contact Table Demo
//!
//! Drives a headless contact table end to end:
//! - items bound to an address book model
//! - column clicks sorting with tie-breakers
//! - an in-place edit that moves the edited contact
//! - a card dragged onto a drop target
//!
//! Run with: cargo run -p glint_widgets --example contact_table [config.toml]

use std::rc::Rc;

use anyhow::Result;
use glint_core::{key_codes, Model, ObjectRef, Value};
use glint_widgets::prelude::*;
use glint_widgets::{rectangle, DragOutcome};

const CONTACTS_CONFIG: &str = r#"
additional_sort_properties = ["last_name", "first_name"]
edit_on_activation = true

[[columns]]
title = "First Name"
property = "first_name"

[[columns]]
title = "Last Name"
property = "last_name"

[[columns]]
title = "Age"
property = "age"
editor = "spinner"
sort_type = "integer"

[[columns]]
title = "City"
property = "address.city"
editor = "combo"
items = ["Bern", "Oslo", "Lima"]
"#;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => TableConfig::from_path(path)?,
        None => TableConfig::from_toml_str(CONTACTS_CONFIG)?,
    };

    let factory = Rc::new(HeadlessEditorFactory::new());
    let mut registry = EditorRegistry::new();
    registry.register_all(factory.clone());

    let view = HeadlessTableView::new();
    let table = TableProxy::with_config(view.clone(), &config, registry)?;

    let book = Model::with_attributes(
        "AddressBook",
        [(
            "contacts",
            Value::List(
                [
                    contact("Liz", "Smith", 34, "Oslo"),
                    contact("Ann", "Jones", 28, "Bern"),
                    contact("Bob", "Smith", 34, "Lima"),
                ]
                .into_iter()
                .map(Value::Object)
                .collect(),
            ),
        )],
    );
    let _items = table.bind_items(&book.as_object(), "contacts")?;
    print_rows("bound", &view);

    view.click_column(2);
    print_rows("by age", &view);
    view.click_column(2);
    print_rows("by age, descending", &view);

    // double click Ann's age and type a new one
    let row = view
        .column_values("first_name")
        .iter()
        .position(|name| name.as_str() == Some("Ann"))
        .unwrap_or_default();
    view.activate(row, 2);
    if let Some(editor) = factory.last() {
        editor.type_text("40");
        editor.press_key(key_codes::ENTER);
    }
    print_rows("after edit", &view);
    println!("selected rows: {:?}", view.selected_rows());

    let canvas = Canvas::new();
    let card = rectangle(0, 0, 40, 60);
    let tray = rectangle(200, 0, 100, 100);
    canvas.add_shape(card.as_object(), ShapeOptions::new().drag_source("card"))?;
    canvas.add_shape(
        tray.as_object(),
        ShapeOptions::new().drop_target(|drop| {
            println!("tray received {}", drop.data);
            true
        }),
    )?;

    let mut ctx = DragContext::new();
    for event in [
        glint_core::Event::pointer(glint_core::EventKind::MouseDown, 10.0, 10.0),
        glint_core::Event::pointer(glint_core::EventKind::MouseMove, 220.0, 20.0),
        glint_core::Event::pointer(glint_core::EventKind::MouseUp, 220.0, 20.0),
    ] {
        if let DragOutcome::Dropped { accepted } = canvas.handle_event(&mut ctx, &event) {
            println!("drop accepted: {}", accepted);
        }
    }
    println!("card at ({}, {})", card.get("x"), card.get("y"));

    Ok(())
}

fn contact(first: &str, last: &str, age: i64, city: &str) -> ObjectRef {
    let address = Model::with_attributes("Address", [("city", city)]);
    Model::builder("Contact")
        .attr("first_name", first)
        .attr("last_name", last)
        .attr("age", age)
        .attr("address", address.as_object())
        .build()
        .as_object()
}

fn print_rows(label: &str, view: &HeadlessTableView) {
    println!("-- {}", label);
    let first = view.column_values("first_name");
    let last = view.column_values("last_name");
    let age = view.column_values("age");
    for ((first, last), age) in first.iter().zip(&last).zip(&age) {
        println!("{:<6} {:<6} {}", first, last, age);
    }
}
