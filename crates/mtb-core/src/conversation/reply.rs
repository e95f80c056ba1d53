//! Outbound presentation requests and the menus they carry.

use crate::{
    catalog::{Category, City},
    conversation::action::{Action, EditField},
    errors::ValidationError,
    listing::{Listing, Vigency},
    search::Occupancy,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    /// Plain text plus optional buttons.
    Prompt { text: String, menu: Menu },
    /// A full listing card (album + caption + context buttons).
    Card {
        listing: Box<Listing>,
        context: CardContext,
    },
    ResultList(ResultPage),
    /// Lightweight status line; shown as a callback toast when it is the only reply.
    Notice(String),
}

impl Reply {
    pub fn prompt(text: impl Into<String>, menu: Menu) -> Self {
        Reply::Prompt {
            text: text.into(),
            menu,
        }
    }

    /// Re-emit a step prompt prefixed with why the last input was refused.
    pub fn rejected(err: &ValidationError, text: impl AsRef<str>, menu: Menu) -> Self {
        Reply::Prompt {
            text: format!("❗ {}\n\n{}", super::prompts::validation(err), text.as_ref()),
            menu,
        }
    }

    pub fn notice(text: impl Into<String>) -> Self {
        Reply::Notice(text.into())
    }

    pub fn card(listing: Listing, context: CardContext) -> Self {
        Reply::Card {
            listing: Box::new(listing),
            context,
        }
    }
}

/// Why a card is being shown; decides its header and buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardContext {
    Created,
    Updated,
    /// Owner viewing from "Mis anuncios".
    Owner,
    SearchResult {
        index: usize,
        total: usize,
        /// Viewer may delete it (owner or administrator).
        deletable: bool,
        editable: bool,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResultPage {
    pub entries: Vec<Listing>,
    /// Index of `entries[0]` in the full result list.
    pub first_index: usize,
    pub total: usize,
    pub page: usize,
    pub page_count: usize,
}

impl ResultPage {
    pub fn has_prev(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.page_count
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MenuOption {
    pub label: String,
    pub action: Action,
}

impl MenuOption {
    pub fn new(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Menu {
    pub rows: Vec<Vec<MenuOption>>,
}

impl Menu {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }

    pub fn row(mut self, options: Vec<MenuOption>) -> Self {
        if !options.is_empty() {
            self.rows.push(options);
        }
        self
    }

    pub fn single(self, label: impl Into<String>, action: Action) -> Self {
        self.row(vec![MenuOption::new(label, action)])
    }

    /// Lay `options` out `per_row` to a row.
    pub fn grid(mut self, options: Vec<MenuOption>, per_row: usize) -> Self {
        let per_row = per_row.max(1);
        let mut options = options.into_iter().peekable();
        while options.peek().is_some() {
            self.rows.push(options.by_ref().take(per_row).collect());
        }
        self
    }

    pub fn skip(self) -> Self {
        self.single("⏭️ Omitir", Action::Skip)
    }

    pub fn cancel(self) -> Self {
        self.single("❌ Cancelar", Action::Cancel)
    }

    pub fn actions(&self) -> impl Iterator<Item = Action> + '_ {
        self.rows.iter().flatten().map(|o| o.action)
    }

    // ============== Standard menus ==============

    pub fn main() -> Self {
        Menu::default()
            .row(vec![
                MenuOption::new("🧳 Dejar objetos", Action::NewListing),
                MenuOption::new("🔍 Buscar objeto", Action::Search),
            ])
            .single("📋 Mis anuncios", Action::MyListings)
    }

    pub fn categories() -> Self {
        let options = Category::ALL
            .iter()
            .map(|c| MenuOption::new(c.label(), Action::Category(*c)))
            .collect();
        Menu::default().grid(options, 2).cancel()
    }

    pub fn search_categories(occ: &Occupancy) -> Self {
        let mut options = vec![MenuOption::new(
            format!("♾ Solo Gratis ({})", occ.free),
            Action::Free,
        )];
        options.extend(Category::ALL.iter().map(|c| {
            MenuOption::new(
                format!("{} ({})", c.label(), occ.category(*c)),
                Action::Category(*c),
            )
        }));
        Menu::default().grid(options, 2).skip().cancel()
    }

    pub fn cities() -> Self {
        let options = City::all()
            .map(|c| MenuOption::new(c.name(), Action::City(c)))
            .collect();
        Menu::default().grid(options, 3)
    }

    pub fn search_cities(occ: &Occupancy) -> Self {
        let options = City::all()
            .map(|c| MenuOption::new(format!("{} ({})", c.name(), occ.city(c)), Action::City(c)))
            .collect();
        Menu::default().grid(options, 3).skip().cancel()
    }

    pub fn vigency(allow_no_expiry: bool) -> Self {
        let mut options = vec![
            MenuOption::new(Vigency::ThreeDays.label(), Action::Vigency(Vigency::ThreeDays)),
            MenuOption::new(Vigency::FiveDays.label(), Action::Vigency(Vigency::FiveDays)),
        ];
        if allow_no_expiry {
            options.push(MenuOption::new(
                Vigency::NoExpiry.label(),
                Action::Vigency(Vigency::NoExpiry),
            ));
        }
        Menu::default().grid(options, 2).cancel()
    }

    pub fn edit_fields() -> Self {
        let options = EditField::all()
            .map(|f| MenuOption::new(f.label(), Action::EditField(f)))
            .collect();
        Menu::default().grid(options, 2).cancel()
    }

    pub fn price() -> Self {
        Menu::default().single("♾ Gratis", Action::Free).cancel()
    }

    pub fn photos_done() -> Self {
        Menu::default()
            .row(vec![
                MenuOption::new("✅ Listo", Action::Done),
                MenuOption::new("⏭️ Omitir", Action::Skip),
            ])
            .cancel()
    }

    pub fn confirm_delete(id: crate::domain::ListingId) -> Self {
        Menu::default()
            .row(vec![
                MenuOption::new("✅ Sí", Action::ConfirmDelete(id)),
                MenuOption::new("❌ No", Action::Cancel),
            ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_fills_rows() {
        let opts = (0..5)
            .map(|i| MenuOption::new(i.to_string(), Action::Open(i)))
            .collect();
        let menu = Menu::default().grid(opts, 2);
        let lens: Vec<_> = menu.rows.iter().map(Vec::len).collect();
        assert_eq!(lens, vec![2, 2, 1]);
    }

    #[test]
    fn vigency_menu_honours_no_expiry_flag() {
        let with = Menu::vigency(true);
        assert!(with
            .actions()
            .any(|a| a == Action::Vigency(Vigency::NoExpiry)));
        let without = Menu::vigency(false);
        assert!(!without
            .actions()
            .any(|a| a == Action::Vigency(Vigency::NoExpiry)));
    }

    #[test]
    fn search_menus_show_counts() {
        let mut occ = Occupancy::default();
        occ.free = 2;
        occ.by_category.insert(Category::Books, 4);
        let menu = Menu::search_categories(&occ);
        let labels: Vec<_> = menu.rows.iter().flatten().map(|o| o.label.as_str()).collect();
        assert!(labels.contains(&"♾ Solo Gratis (2)"));
        assert!(labels.contains(&"📚 Libros (4)"));
        assert!(labels.contains(&"🌟 Otros (0)"));
    }
}
