//! Telegram HTML formatting for listing cards and result entries.

use chrono::{DateTime, Utc};

use crate::listing::Listing;

pub const FREE_BADGE: &str = "♾ ¡Gratis!";

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Cut to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    format!("{}...", text.chars().take(keep).collect::<String>())
}

fn date(t: DateTime<Utc>) -> String {
    t.format("%d.%m.%Y").to_string()
}

/// Plain-text button label: `#id [badge] title (price)`.
pub fn entry_label(listing: &Listing) -> String {
    let badge = if listing.is_free() {
        format!("{FREE_BADGE} ")
    } else {
        String::new()
    };
    let label = format!(
        "#{} {badge}{} ({})",
        listing.id, listing.title, listing.price
    );
    truncate_chars(&label, 64)
}

/// HTML caption for a listing card. `header` is a bold status line shown first.
pub fn card_caption(listing: &Listing, header: Option<&str>) -> String {
    let mut lines = Vec::new();

    if let Some(header) = header {
        lines.push(format!("<b>{}</b>", escape_html(header)));
    }

    let title = escape_html(&listing.title);
    if listing.is_free() {
        lines.push(format!("<b>{FREE_BADGE} {title}</b>"));
    } else {
        lines.push(format!("<b>{title}</b>"));
    }
    lines.push(format!("📋 Categoría: {}", escape_html(listing.category.label())));
    if listing.category.is_bundle() {
        lines.push("📦 Kit de objetos para mudanza".to_string());
    }
    lines.push(format!("💰 Precio: {}", listing.price));
    if !listing.description.is_empty() {
        lines.push(format!("📝 Descripción: {}", escape_html(&listing.description)));
    }

    let mut location = match listing.city() {
        Some(city) => format!("<b>📍 Ciudad:</b> {}", escape_html(city.name())),
        None => "<b>📍 Ubicación:</b>".to_string(),
    };
    if let Some(point) = listing.location.point() {
        location.push_str(&format!(
            " (<a href=\"{}\">Mostrar en el mapa</a>)",
            point.map_url()
        ));
    }
    lines.push(location);

    lines.push(format!("📞 Contacto: {}", escape_html(&listing.contact)));
    lines.push(format!("📅 Publicado: {}", date(listing.posted_at)));
    lines.push(match listing.expires_at {
        Some(t) => format!("⏰ Vence: {}", date(t)),
        None => "⏰ Vence: sin vencimiento".to_string(),
    });

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::Category,
        domain::GeoPoint,
        listing::{tests::sample, tests::t0, FieldEdit, Price},
    };

    #[test]
    fn escapes_html() {
        assert_eq!(escape_html("<b>&\"</b>"), "&lt;b&gt;&amp;&quot;&lt;/b&gt;");
    }

    #[test]
    fn entry_label_marks_free_listings() {
        let mut l = sample(12, 1, "Silla");
        assert_eq!(entry_label(&l), "#12 Silla (10.00)");
        l.apply(FieldEdit::Price(Price::Free), t0()).unwrap();
        assert_eq!(entry_label(&l), "#12 ♾ ¡Gratis! Silla (Gratis)");
    }

    #[test]
    fn entry_label_is_truncated_by_chars() {
        let mut l = sample(1, 1, &"ñ".repeat(50));
        l.apply(FieldEdit::Price(Price::Free), t0()).unwrap();
        let label = entry_label(&l);
        assert_eq!(label.chars().count(), 64);
        assert!(label.ends_with("..."));
    }

    #[test]
    fn caption_escapes_user_text_and_links_map() {
        let mut l = sample(3, 1, "<Mesa & silla>");
        l.apply(FieldEdit::Contact("@yo <b>".into()), t0()).unwrap();
        l.apply(
            FieldEdit::Geolocation(GeoPoint::new(-0.18, -78.47).unwrap()),
            t0(),
        )
        .unwrap();
        let caption = card_caption(&l, Some("✅ Anuncio #3 publicado exitosamente!"));

        assert!(caption.starts_with("<b>✅ Anuncio #3"));
        assert!(caption.contains("&lt;Mesa &amp; silla&gt;"));
        assert!(caption.contains("@yo &lt;b&gt;"));
        assert!(caption.contains("maps.google.com/maps?q=-0.18,-78.47"));
        assert!(caption.contains("📅 Publicado: 01.03.2025"));
        assert!(caption.contains("⏰ Vence: 04.03.2025"));
        assert!(!caption.contains("Descripción"));
    }

    #[test]
    fn caption_notes_bundle_category() {
        let mut l = sample(3, 1, "Todo");
        l.apply(FieldEdit::Category(Category::MovingKit), t0()).unwrap();
        assert!(card_caption(&l, None).contains("Kit de objetos para mudanza"));
    }
}
