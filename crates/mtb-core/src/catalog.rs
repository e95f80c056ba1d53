//! Fixed category and city enumerations.
//!
//! Each enum has a single table mapping variant ↔ stable key ↔ display label.
//! Lookups go through the table in both directions; callers never derive a key
//! by editing a label.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    MovingKit,
    Furniture,
    Electronics,
    Clothing,
    Accessories,
    Books,
    Toys,
    Appliances,
    Sports,
    Other,
}

/// (variant, stable key, plain name, button label)
const CATEGORIES: [(Category, &str, &str, &str); 10] = [
    (Category::MovingKit, "kit", "¡Kit de mudanza!", "📦 ¡Kit de mudanza!"),
    (Category::Furniture, "muebles", "Muebles", "🛋️ Muebles"),
    (Category::Electronics, "electronica", "Electrónica", "📱 Electrónica"),
    (Category::Clothing, "ropa", "Ropa", "👗 Ropa"),
    (Category::Accessories, "accesorios", "Accesorios", "👜 Accesorios"),
    (Category::Books, "libros", "Libros", "📚 Libros"),
    (Category::Toys, "juguetes", "Juguetes", "🧸 Juguetes"),
    (Category::Appliances, "electrodomesticos", "Electrodomésticos", "🔌 Electrodomésticos"),
    (Category::Sports, "deportes", "Deportes", "🏀 Deportes"),
    (Category::Other, "otros", "Otros", "🌟 Otros"),
];

impl Category {
    pub const ALL: [Category; 10] = [
        Category::MovingKit,
        Category::Furniture,
        Category::Electronics,
        Category::Clothing,
        Category::Accessories,
        Category::Books,
        Category::Toys,
        Category::Appliances,
        Category::Sports,
        Category::Other,
    ];

    fn row(self) -> &'static (Category, &'static str, &'static str, &'static str) {
        // The table lists every variant exactly once, in declaration order.
        &CATEGORIES[self as usize]
    }

    pub fn key(self) -> &'static str {
        self.row().1
    }

    pub fn name(self) -> &'static str {
        self.row().2
    }

    pub fn label(self) -> &'static str {
        self.row().3
    }

    pub fn from_key(key: &str) -> Option<Self> {
        CATEGORIES
            .iter()
            .find(|(_, k, _, _)| *k == key)
            .map(|(c, ..)| *c)
    }

    /// Accepts a key, a plain name or a button label (stored records used labels).
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        CATEGORIES
            .iter()
            .find(|(_, key, name, label)| *key == raw || *name == raw || *label == raw)
            .map(|(c, ..)| *c)
    }

    /// The bundle category accepts more additional photos.
    pub fn is_bundle(self) -> bool {
        self == Category::MovingKit
    }

    pub fn max_additional_photos(self) -> usize {
        if self.is_bundle() {
            9
        } else {
            3
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum City {
    Quito,
    Guayaquil,
    Cuenca,
    SantoDomingo,
    Manta,
    Portoviejo,
    Ambato,
    Riobamba,
    Loja,
    Ibarra,
    Esmeraldas,
    Babahoyo,
    Latacunga,
    Machala,
    Quevedo,
    Tulcan,
    Salinas,
    Banos,
    Montanita,
    Otavalo,
    Puyo,
    Tena,
    Atacames,
    SanVicente,
}

/// (variant, stable key, display name)
const CITIES: [(City, &str, &str); 24] = [
    (City::Quito, "quito", "Quito"),
    (City::Guayaquil, "guayaquil", "Guayaquil"),
    (City::Cuenca, "cuenca", "Cuenca"),
    (City::SantoDomingo, "santo_domingo", "Santo Domingo"),
    (City::Manta, "manta", "Manta"),
    (City::Portoviejo, "portoviejo", "Portoviejo"),
    (City::Ambato, "ambato", "Ambato"),
    (City::Riobamba, "riobamba", "Riobamba"),
    (City::Loja, "loja", "Loja"),
    (City::Ibarra, "ibarra", "Ibarra"),
    (City::Esmeraldas, "esmeraldas", "Esmeraldas"),
    (City::Babahoyo, "babahoyo", "Babahoyo"),
    (City::Latacunga, "latacunga", "Latacunga"),
    (City::Machala, "machala", "Machala"),
    (City::Quevedo, "quevedo", "Quevedo"),
    (City::Tulcan, "tulcan", "Tulcán"),
    (City::Salinas, "salinas", "Salinas"),
    (City::Banos, "banos", "Baños"),
    (City::Montanita, "montanita", "Montañita"),
    (City::Otavalo, "otavalo", "Otavalo"),
    (City::Puyo, "puyo", "Puyo"),
    (City::Tena, "tena", "Tena"),
    (City::Atacames, "atacames", "Atacames"),
    (City::SanVicente, "san_vicente", "San Vicente"),
];

impl City {
    pub fn all() -> impl Iterator<Item = City> {
        CITIES.iter().map(|(c, ..)| *c)
    }

    fn row(self) -> &'static (City, &'static str, &'static str) {
        &CITIES[self as usize]
    }

    pub fn key(self) -> &'static str {
        self.row().1
    }

    pub fn name(self) -> &'static str {
        self.row().2
    }

    pub fn from_key(key: &str) -> Option<Self> {
        CITIES.iter().find(|(_, k, _)| *k == key).map(|(c, ..)| *c)
    }

    /// Accepts a key or a display name, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        let lower = raw.trim().to_lowercase();
        CITIES
            .iter()
            .find(|(_, key, name)| *key == lower || name.to_lowercase() == lower)
            .map(|(c, ..)| *c)
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
