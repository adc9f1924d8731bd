use super::PriceQuery;

pub const PRICES_SYSTEM: &str = "You are an agricultural market assistant for Indian farmers.\n\
Reply with JSON only: an array of objects with the fields market, state, crop, \
min_price, max_price, modal_price (INR per quintal) and date (YYYY-MM-DD).\n\
Only include mandi prices you are confident about. Reply with [] if you have none.";

pub const SCHEMES_SYSTEM: &str = "You are an assistant that explains Indian government schemes for farmers.\n\
Reply with JSON only: an array of objects with the fields name, category, benefit, \
eligibility and how_to_apply.\n\
Keep each field under 40 words. Reply with [] if you know of no matching scheme.";

pub fn prices_user(query: &PriceQuery) -> String {
    match &query.state {
        Some(state) => format!("Latest mandi prices for {} in {}.", query.crop, state),
        None => format!("Latest mandi prices for {} across India.", query.crop),
    }
}

pub fn schemes_user(category: Option<&str>) -> String {
    match category {
        Some(c) => format!("Current central and state schemes for farmers in the category: {c}."),
        None => "Current central and state schemes for farmers.".to_string(),
    }
}
