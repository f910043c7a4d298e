//! Inventory text parsing and the fallback starter kit.

use crate::character::InventoryItem;

/// Items a new game starts with when the generated list yields nothing.
pub fn starter_kit() -> Vec<InventoryItem> {
    vec![
        InventoryItem::new("Traveler's Cloak", 1)
            .with_description("A weathered cloak against wind and rain"),
        InventoryItem::new("Rations", 3).with_description("Dried meat, hard bread and cheese"),
        InventoryItem::new("Torch", 2).with_description("Pitch-soaked wood that burns for an hour"),
    ]
}

/// Render items as bullet lines that [`parse_inventory`] reads back.
pub fn render_inventory(items: &[InventoryItem]) -> String {
    items
        .iter()
        .map(|i| {
            if i.description.is_empty() {
                format!("- {} ({})", i.item, i.quantity)
            } else {
                format!("- {} ({}): {}", i.item, i.quantity, i.description)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse bullet lines such as `- Rope (2): fifty feet of hemp`.
///
/// Lines that are not bullets (`-`, `*`, `•`, `1.` or `1)`) are skipped.
/// A trailing `(digits)` on the item name sets the quantity, otherwise 1.
pub fn parse_inventory(text: &str) -> Vec<InventoryItem> {
    text.lines().filter_map(parse_line).collect()
}

/// The parsed list, or the starter kit when nothing parses.
pub fn inventory_or_starter_kit(text: &str) -> Vec<InventoryItem> {
    let items = parse_inventory(text);
    if items.is_empty() {
        starter_kit()
    } else {
        items
    }
}

fn parse_line(line: &str) -> Option<InventoryItem> {
    let body = strip_bullet(line.trim())?;

    let (head, description) = match body.split_once(':') {
        Some((head, description)) => (head.trim(), description.trim()),
        None => (body, ""),
    };
    let (name, quantity) = split_quantity(head);
    let name = name.trim_matches(|c| c == '*' || c == '_').trim();
    if name.is_empty() {
        return None;
    }

    Some(InventoryItem::new(name, quantity).with_description(description))
}

fn strip_bullet(line: &str) -> Option<&str> {
    for marker in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return Some(rest.trim());
        }
    }

    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return Some(rest.trim());
        }
    }
    None
}

fn split_quantity(head: &str) -> (&str, u32) {
    if let Some(inner) = head.strip_suffix(')') {
        if let Some(open) = inner.rfind('(') {
            let digits = inner[open + 1..].trim();
            if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                if let Ok(quantity) = digits.parse::<u32>() {
                    return (inner[..open].trim(), quantity);
                }
            }
        }
    }
    (head, 1)
}
