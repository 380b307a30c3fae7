//! Reads the identity provider's login form and its inline error element.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use thiserror::Error;

/// DOM id of the login form.
pub const LOGIN_FORM_ID: &str = "login-form";

/// Name of the hidden anti-forgery input.
pub const ANTI_FORGERY_FIELD: &str = "fkey";

static ANTI_FORGERY_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("input[name='fkey']"));
static ERROR_MESSAGE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector(".js-error-message"));

/// Compiles a CSS selector at static init; panics on invalid pattern.
fn compile_static_selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid static selector '{css}': {e:?}"))
}

/// Submit target and anti-forgery token of the login form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    /// Raw `action` attribute; may be relative to the page URL.
    pub action_url: String,
    /// Value of the hidden `fkey` input.
    pub anti_forgery_token: String,
}

/// The page did not contain a usable login form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// No element carries the login form id.
    #[error("login form '#{form_id}' not found on page")]
    MissingForm {
        /// The DOM id searched for.
        form_id: String,
    },

    /// The form has no `action` attribute.
    #[error("login form '#{form_id}' has no action attribute")]
    MissingAction {
        /// The DOM id searched for.
        form_id: String,
    },

    /// No `fkey` input with a value exists.
    #[error("anti-forgery input 'fkey' not found on page")]
    MissingToken,
}

/// Extracts the submit URL and anti-forgery token of the form with id `form_id`.
///
/// # Errors
///
/// Returns [`FormError`] when the form, its `action`, or the token input is absent.
pub fn read_login_form(html: &str, form_id: &str) -> Result<LoginForm, FormError> {
    let document = Html::parse_document(html);

    let form_selector =
        Selector::parse(&format!("[id=\"{form_id}\"]")).map_err(|_| FormError::MissingForm {
            form_id: form_id.to_string(),
        })?;
    let form = document
        .select(&form_selector)
        .next()
        .ok_or_else(|| FormError::MissingForm {
            form_id: form_id.to_string(),
        })?;

    let action_url = form
        .value()
        .attr("action")
        .map(str::trim)
        .filter(|action| !action.is_empty())
        .ok_or_else(|| FormError::MissingAction {
            form_id: form_id.to_string(),
        })?
        .to_string();

    let anti_forgery_token = document
        .select(&ANTI_FORGERY_SELECTOR)
        .find_map(|input| input.value().attr("value"))
        .ok_or(FormError::MissingToken)?
        .to_string();

    Ok(LoginForm {
        action_url,
        anti_forgery_token,
    })
}

/// Returns the trimmed text of the page's `js-error-message` element, if any.
///
/// Empty placeholder elements carry no message and are skipped.
#[must_use]
pub fn read_error_message(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&ERROR_MESSAGE_SELECTOR)
        .map(|element| element.text().collect::<String>().trim().to_string())
        .find(|message| !message.is_empty())
}
