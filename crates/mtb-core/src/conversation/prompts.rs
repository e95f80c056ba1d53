//! User-facing Spanish texts.

use crate::{
    domain::{ListingId, UserId},
    errors::ValidationError,
    listing::{DESCRIPTION_MAX_CHARS, TITLE_MAX_CHARS},
};

pub const WELCOME: &str = "👋 ¡Bienvenido! Seleccione una acción:";
pub const MAIN_MENU: &str = "Seleccione una acción:";
pub const CANCELLED: &str = "✅ Acción cancelada.";
pub const UNKNOWN_COMMAND: &str = "❗ Comando no reconocido. Use el menú principal.";
pub const BANNED: &str = "🚫 Su cuenta está bloqueada. Contacte al administrador.";
pub const NOT_AUTHORIZED: &str = "⛔ No autorizado.";
pub const STALE_ACTION: &str = "⌛ Esta acción ya no está disponible.";
pub const NOT_FOUND_OR_FORBIDDEN: &str = "❗ Anuncio no encontrado o no le pertenece.";
pub const LISTING_GONE: &str = "❗ El anuncio ya no está disponible.";

// Create flow
pub const ASK_CATEGORY: &str =
    "📋 Seleccione la categoría para el objeto o '📦 ¡Kit de mudanza!' para un conjunto de objetos:";
pub const ASK_DESCRIPTION: &str =
    "📝 Ingrese la descripción del objeto (hasta 200 caracteres, opcional):";
pub const ASK_PRIMARY_PHOTO: &str = "📸 Envíe la foto principal del objeto:";
pub const ASK_PRICE: &str = "💰 Indique el precio (en dólares) o 'Gratis':\nIngrese 0 para un anuncio gratuito o el monto (por ejemplo, 10.50).";
pub const ASK_CITY: &str = "🏙️ Indique la ciudad (u omita y envíe una geolocalización):";
pub const ASK_LOCATION_KIND: &str = "📍 Indique la ubicación:";
pub const ASK_GEOLOCATION: &str = "📍 Envíe la geolocalización del objeto (📎 → Ubicación):";
pub const ASK_CONTACT: &str =
    "📞 Ingrese la información de contacto (por ejemplo, número de teléfono):";
pub const ASK_VIGENCY: &str = "📅 Indique el período de validez del anuncio:";
pub const CREATED: &str = "🎉 ¡Anuncio creado! Seleccione una acción:";

// Search flow
pub const ASK_KEYWORD: &str =
    "🔎 Ingrese una palabra clave para la búsqueda (por ejemplo, 'silla') o omita:";
pub const ASK_SEARCH_CATEGORY: &str = "📋 Seleccione una categoría para la búsqueda o omita:";
pub const ASK_SEARCH_CITY: &str = "🏙️ Seleccione una ciudad para la búsqueda o omita:";
pub const NO_RESULTS: &str = "🔍 No se encontraron resultados. Intente modificar la búsqueda.";
pub const NO_MORE_RESULTS: &str = "⛔ No hay más resultados.";
pub const FIRST_PAGE: &str = "⛔ Esta es la primera página.";
pub const FIRST_ITEM: &str = "⛔ Este es el primer anuncio.";
pub const LAST_ITEM: &str = "⛔ Este es el último anuncio.";
pub const SEARCH_EXPIRED: &str = "⌛ La búsqueda ya no está activa. Inicie una nueva búsqueda.";

// My listings / edit / delete
pub const NO_OWN_LISTINGS: &str = "📭 No tienes anuncios activos.";
pub const PICK_OWN_LISTING: &str = "📋 Seleccione un anuncio para ver:";
pub const ASK_EDIT_FIELD: &str = "✏️ ¿Qué desea editar?";
pub const ASK_EDIT_LOCATION_KIND: &str =
    "📍 ¿Desea mantener la ciudad o usar solo la geolocalización?";
pub const ASK_NEW_LOCATION: &str = "📍 Envíe la nueva geolocalización (📎 → Ubicación):";
pub const UPDATED: &str = "✅ Cambios guardados. Seleccione una acción:";

// Administration
pub const ADMIN_MENU: &str = "🛠 Administración. Seleccione una acción:";
pub const ASK_USER_ID: &str = "🆔 Ingrese el ID numérico del usuario:";

pub fn ask_title() -> String {
    format!("✏️ Ingrese el título del objeto (hasta {TITLE_MAX_CHARS} caracteres):")
}

pub fn ask_additional_photos(max: usize) -> String {
    format!("📷 Envíe hasta {max} fotos adicionales y presione '✅ Listo', u omita:")
}

pub fn photo_added(count: usize, max: usize) -> String {
    format!("✅ Foto agregada ({count}/{max}). Agregue más, presione '✅ Listo' u omita:")
}

pub fn ask_edit_field(field_prompt: &str) -> String {
    field_prompt.replace("Ingrese la", "Ingrese una nueva").replace("Ingrese el", "Ingrese un nuevo")
}

pub fn confirm_delete(id: ListingId, title: &str) -> String {
    format!("🗑 ¿Seguro que desea eliminar el anuncio #{id} \"{title}\"?")
}

pub fn deleted(id: ListingId) -> String {
    format!("🗑 Anuncio #{id} eliminado exitosamente.")
}

pub fn results_header(total: usize) -> String {
    format!("🛒 Anuncios encontrados: {total}. Seleccione para ver:")
}

pub fn user_banned(user: UserId, banned: bool) -> String {
    if banned {
        format!("🚫 Usuario {user} bloqueado.")
    } else {
        format!("✅ Usuario {user} desbloqueado.")
    }
}

/// Why an input was refused, in the user's language.
pub fn validation(err: &ValidationError) -> String {
    match err {
        ValidationError::TitleEmpty => "El título no puede estar vacío.".to_string(),
        ValidationError::TitleTooLong { max } => {
            format!("El título es demasiado largo. Ingrese hasta {max} caracteres.")
        }
        ValidationError::DescriptionTooLong { max } => {
            format!("La descripción es demasiado larga. Ingrese hasta {max} caracteres.")
        }
        ValidationError::InvalidPrice => {
            "Ingrese un precio válido (número ≥ 0, por ejemplo, 10.50) o 'Gratis'.".to_string()
        }
        ValidationError::ContactEmpty => {
            "La información de contacto no puede estar vacía.".to_string()
        }
        ValidationError::TooManyPhotos { max } => {
            format!("Se alcanzó el máximo ({max} fotos adicionales).")
        }
        ValidationError::UnknownCategory(_) => {
            "Por favor, seleccione una categoría de las propuestas.".to_string()
        }
        ValidationError::UnknownCity(_) => {
            "Por favor, seleccione una ciudad de las propuestas.".to_string()
        }
        ValidationError::LocationRequired => {
            "Se necesita una ciudad o una geolocalización.".to_string()
        }
        ValidationError::ExpiryNotAfterPosting => "Período de validez inválido.".to_string(),
        ValidationError::MissingField(_) => "Faltan datos del anuncio.".to_string(),
        ValidationError::UnexpectedInput => {
            "Entrada no válida para este paso.".to_string()
        }
    }
}
