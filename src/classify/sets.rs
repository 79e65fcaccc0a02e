use phf::{phf_map, phf_set};

/// Shared mailboxes rarely tied to a unique human.
pub static ROLE_ACCOUNTS: phf::Set<&'static str> = phf_set! {
    "admin", "support", "info", "sales", "contact", "help", "abuse",
    "security", "billing", "noreply", "postmaster", "webmaster", "hello",
    "mail", "team", "office", "marketing", "staff", "newsletter",
};

pub static GENERIC_TEST_NAMES: phf::Set<&'static str> = phf_set! {
    "test", "user", "demo", "example", "nobody",
};

pub static COMMON_HUMAN_NAMES: phf::Set<&'static str> = phf_set! {
    "carlos", "juan", "maria", "pedro", "jose", "andres", "luis", "ana",
    "laura", "david", "miguel", "sofia", "paula", "daniel",
};

pub static FREE_PROVIDERS: phf::Set<&'static str> = phf_set! {
    "gmail.com", "googlemail.com", "outlook.com", "hotmail.com",
    "yahoo.com", "icloud.com", "protonmail.com", "gmx.com", "yandex.com",
};

/// Large consumer providers that never expose RCPT-level verification;
/// probing them is wasted I/O and a reputational hazard.
pub static NON_VERIFIABLE_DOMAINS: phf::Set<&'static str> = phf_set! {
    "gmail.com", "googlemail.com", "outlook.com", "hotmail.com", "live.com",
    "yahoo.com", "icloud.com", "me.com", "mac.com", "office365.com",
    "microsoft.com",
};

pub static DISPOSABLE_DOMAINS: phf::Set<&'static str> = phf_set! {
    "mailinator.com", "tempmail.com", "guerrillamail.com",
    "10minutemail.com", "trashmail.com", "yopmail.com",
};

pub static PRIVATE_RELAY_PROVIDERS: phf::Map<&'static str, &'static str> = phf_map! {
    "privaterelay.appleid.com" => "apple",
    "duck.com" => "duckduckgo",
    "simplelogin.co" => "simplelogin",
    "relay.firefox.com" => "firefox",
    "pm.me" => "protonmail",
};

pub const INSTITUTIONAL_TLDS: &[&str] = &[".edu", ".gov", ".mil"];
