//! Shared fixtures.

use weave_template::{HelperRegistry, Scope, Value, scope};

/// The canonical list template.
pub const LIST_TEMPLATE: &str = "<ul>{{each items}}<li>#{title}</li>{{/each}}</ul>";

/// A keyed card list: every card carries an authored id.
pub const CARD_TEMPLATE: &str = concat!(
    r#"<section class="cards">"#,
    r#"{{each cards}}<article id="card-#{id}"><h2>#{title}</h2><p>#{body}</p></article>{{/each}}"#,
    "</section>"
);

/// Markup exercising void, raw-text and boolean-attribute handling.
pub const FORM_MARKUP: &str = concat!(
    r#"<form id="f" action="/save">"#,
    r#"<label for="n">Name</label><input id="n" name="n" required>"#,
    r#"<textarea name="t">a &lt; b</textarea>"#,
    r#"<button type="submit" disabled>Save</button>"#,
    "</form>"
);

/// Markup the patch compiler must reject.
pub const COMMENTED_MARKUP: &str = "<div><!-- note --><p>x</p></div>";

/// A scope with one `items` list of `{title}` maps.
#[must_use]
pub fn list_scope(titles: &[&str]) -> Scope {
    let items: Vec<Value> = titles
        .iter()
        .map(|title| Value::from(scope! { "title" => *title }))
        .collect();
    scope! { "items" => items }
}

/// A scope for [`CARD_TEMPLATE`]: `(id, title, body)` triples.
#[must_use]
pub fn card_scope(cards: &[(u32, &str, &str)]) -> Scope {
    let cards: Vec<Value> = cards
        .iter()
        .map(|&(id, title, body)| {
            Value::from(scope! { "id" => id, "title" => title, "body" => body })
        })
        .collect();
    scope! { "cards" => cards }
}

/// A registry with `upper`, `join` and `greet` helpers.
#[must_use]
pub fn sample_helpers() -> HelperRegistry {
    let helpers = HelperRegistry::new();
    let registered = helpers
        .register("upper", |args| {
            Value::from(
                args.first()
                    .map(|v| v.to_text().to_uppercase())
                    .unwrap_or_default(),
            )
        })
        .and_then(|h| {
            h.register("join", |args| {
                let parts: Vec<String> = args.iter().map(|v| v.to_text().into_owned()).collect();
                Value::from(parts.join(" "))
            })
        })
        .and_then(|h| h.register("greet", |_| Value::from("hi")));
    if let Err(err) = registered {
        tracing::warn!(%err, "fixture helper rejected");
    }
    helpers
}
