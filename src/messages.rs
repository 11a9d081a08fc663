//! User-facing text. The application speaks Swedish to its users; the admin
//! area keeps the English wording it has always had.

pub const FIELDS_REQUIRED: &str = "Alla fält måste fyllas i";
pub const PASSWORD_TOO_SHORT: &str = "Lösenordet måste vara minst 6 tecken";
pub const PASSWORDS_DIFFER: &str = "Lösenorden matchar inte";
pub const USERNAME_TAKEN: &str = "Användarnamnet är redan taget";

pub const INVALID_CREDENTIALS: &str = "Felaktigt användarnamn eller lösenord";
pub const LOGIN_LOCKED_OUT: &str =
    "För många misslyckade försök. Vänta ett par sekunder innan du försöker igen.";
pub const INVALID_ADMIN_CREDENTIALS: &str = "Invalid admin credentials";
pub const ADMIN_LOGIN_LOCKED_OUT: &str =
    "För många misslyckade försök. Vänta några minuter innan du försöker igen.";

pub const NOT_LOGGED_IN: &str = "Du måste vara inloggad";
pub const ADMIN_REQUIRED: &str = "Admin access required";
pub const INVALID_SETUP_KEY: &str = "Invalid admin setup key";
pub const ADMIN_SETUP_DISABLED: &str = "Admin setup is disabled";

pub const INVALID_CATEGORY: &str = "Du måste välja en giltig kategori.";
pub const INVALID_AMOUNT: &str = "Beloppet måste vara större än 0.";
pub const INVALID_DATE: &str = "Du måste ange ett giltigt datum.";
pub const BUDGET_FORBIDDEN: &str = "Du har inte behörighet till denna budgetpost";

pub const SELF_DELETION: &str = "You cannot delete your own admin account";
pub const USER_NOT_FOUND: &str = "User not found";

pub const GENERIC_FAILURE: &str = "Ett fel uppstod";
