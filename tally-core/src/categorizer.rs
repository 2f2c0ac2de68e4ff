//! Credit-card vendor categorization.
//!
//! Ordered substring matching against a static vendor table, then keyword
//! fallbacks. The first vendor key found in the upper-cased description wins,
//! so longer keys that map differently from a shorter key they contain must
//! come first.

use crate::finance::CategoryTriple;
use crate::finance::MajorCategory::{
    Excluded, MealsAndEntertainment, OperatingExpenses, PaymentsAndFees, Travel, Uncategorized,
};

/// Vendor substring -> classification, checked in order
pub static VENDOR_TABLE: &[(&str, CategoryTriple)] = &[
    // Software, AI and SaaS
    ("ANTHROPIC", CategoryTriple::new(OperatingExpenses, "Software & Subscriptions", "AI Services")),
    ("OPENAI", CategoryTriple::new(OperatingExpenses, "Software & Subscriptions", "AI Services")),
    ("CHATGPT", CategoryTriple::new(OperatingExpenses, "Software & Subscriptions", "AI Services")),
    ("MIDJOURNEY", CategoryTriple::new(OperatingExpenses, "Software & Subscriptions", "AI Services")),
    ("GITHUB", CategoryTriple::new(OperatingExpenses, "Software & Subscriptions", "Development Tools")),
    ("VERCEL", CategoryTriple::new(OperatingExpenses, "Software & Subscriptions", "Cloud Services")),
    ("MONGODBCLOUD", CategoryTriple::new(OperatingExpenses, "Software & Subscriptions", "Cloud Services")),
    ("FIVERR", CategoryTriple::new(OperatingExpenses, "Software & Subscriptions", "Freelance Services")),
    ("UPWORK", CategoryTriple::new(OperatingExpenses, "Software & Subscriptions", "Freelance Services")),
    ("PANDADOC", CategoryTriple::new(OperatingExpenses, "Software & Subscriptions", "Document Management")),
    ("ESET", CategoryTriple::new(OperatingExpenses, "Software & Subscriptions", "Security Software")),
    ("ELEMENTOR", CategoryTriple::new(OperatingExpenses, "Software & Subscriptions", "Website Builder")),
    ("SQUARESPACE", CategoryTriple::new(OperatingExpenses, "Software & Subscriptions", "Website Hosting")),
    ("BILL*BILL", CategoryTriple::new(OperatingExpenses, "Software & Subscriptions", "Payment Processing")),

    // Cloud & infrastructure
    ("MICROSOFT", CategoryTriple::new(OperatingExpenses, "Software & Subscriptions", "Office Software")),
    ("GOOGLE", CategoryTriple::new(OperatingExpenses, "Software & Subscriptions", "Cloud Services")),
    ("AWS", CategoryTriple::new(OperatingExpenses, "Software & Subscriptions", "Cloud Services")),
    ("FIREBASE", CategoryTriple::new(OperatingExpenses, "Software & Subscriptions", "Cloud Services")),
    ("YOUTUBE", CategoryTriple::new(OperatingExpenses, "Software & Subscriptions", "Media Services")),
    ("GODADDY", CategoryTriple::new(OperatingExpenses, "Software & Subscriptions", "Domain & Hosting")),

    // Transportation
    ("TESLA SUPERCHARGER", CategoryTriple::new(Travel, "Travel & Transportation", "Vehicle Fuel")),
    ("TESLA SERVICE", CategoryTriple::new(Travel, "Travel & Transportation", "Vehicle Maintenance")),
    ("UBER", CategoryTriple::new(Travel, "Travel & Transportation", "Ground Transportation")),
    ("DELTA AIR", CategoryTriple::new(Travel, "Travel & Transportation", "Air Travel")),
    ("AMERICAN AIRLINES", CategoryTriple::new(Travel, "Travel & Transportation", "Air Travel")),
    ("UNITED", CategoryTriple::new(Travel, "Travel & Transportation", "Air Travel")),
    ("TOBACCO ROAD HARLEY", CategoryTriple::new(Travel, "Travel & Transportation", "Vehicle Maintenance")),

    // Hotels
    ("RENAISSANCE", CategoryTriple::new(Travel, "Travel & Lodging", "Hotels")),
    ("WESTIN", CategoryTriple::new(Travel, "Travel & Lodging", "Hotels")),
    ("W SAN FRANCISCO", CategoryTriple::new(Travel, "Travel & Lodging", "Hotels")),
    ("MARRIOTT", CategoryTriple::new(Travel, "Travel & Lodging", "Hotels")),
    ("HILTON", CategoryTriple::new(Travel, "Travel & Lodging", "Hotels")),
    ("HYATT", CategoryTriple::new(Travel, "Travel & Lodging", "Hotels")),

    // Office rent: ahead of every restaurant key
    ("YSI*HIGHLAND", CategoryTriple::new(OperatingExpenses, "Office & Real Estate", "Office Rent")),
    ("YSI*", CategoryTriple::new(OperatingExpenses, "Office & Real Estate", "Office Rent")),

    // Client meals
    ("BAR TACO NORTH HILLS", CategoryTriple::new(MealsAndEntertainment, "Meals & Entertainment", "Client Meals")),
    ("BAR TACO", CategoryTriple::new(MealsAndEntertainment, "Meals & Entertainment", "Client Meals")),
    ("RUTH'S CHRIS", CategoryTriple::new(MealsAndEntertainment, "Meals & Entertainment", "Client Meals")),
    ("FIREBIRDS", CategoryTriple::new(MealsAndEntertainment, "Meals & Entertainment", "Client Meals")),
    ("CAPITAL GRILLE", CategoryTriple::new(MealsAndEntertainment, "Meals & Entertainment", "Client Meals")),
    ("RH RALEIGH RESTAURANT", CategoryTriple::new(MealsAndEntertainment, "Meals & Entertainment", "Client Meals")),
    ("J ALEXANDER", CategoryTriple::new(MealsAndEntertainment, "Meals & Entertainment", "Client Meals")),
    ("YARD HOUSE", CategoryTriple::new(MealsAndEntertainment, "Meals & Entertainment", "Client Meals")),
    ("ANGUS BARN", CategoryTriple::new(MealsAndEntertainment, "Meals & Entertainment", "Client Meals")),
    ("TST*", CategoryTriple::new(MealsAndEntertainment, "Meals & Entertainment", "Client Meals")),
    ("CLYDES", CategoryTriple::new(MealsAndEntertainment, "Meals & Entertainment", "Client Meals")),
    ("PICCOLO FORNO", CategoryTriple::new(MealsAndEntertainment, "Meals & Entertainment", "Client Meals")),
    ("UMSTEAD", CategoryTriple::new(MealsAndEntertainment, "Meals & Entertainment", "Client Meals")),
    ("CHUY'S", CategoryTriple::new(MealsAndEntertainment, "Meals & Entertainment", "Client Meals")),
    ("GOODNIGHTS", CategoryTriple::new(MealsAndEntertainment, "Meals & Entertainment", "Client Meals")),
    ("LAWRENCE FOOD CO", CategoryTriple::new(MealsAndEntertainment, "Meals & Entertainment", "Client Meals")),
    ("CHUKO RAMEN", CategoryTriple::new(MealsAndEntertainment, "Meals & Entertainment", "Client Meals")),
    ("CAVA", CategoryTriple::new(MealsAndEntertainment, "Meals & Entertainment", "Client Meals")),
    ("COQUETTE", CategoryTriple::new(MealsAndEntertainment, "Meals & Entertainment", "Client Meals")),
    ("SHARKYS", CategoryTriple::new(MealsAndEntertainment, "Meals & Entertainment", "Client Meals")),

    // Team events
    ("CARY SPORTS", CategoryTriple::new(MealsAndEntertainment, "Meals & Entertainment", "Team Events")),
    ("TOP GOLF", CategoryTriple::new(MealsAndEntertainment, "Meals & Entertainment", "Team Events")),

    // Utilities & bills
    ("ATT*BILL", CategoryTriple::new(OperatingExpenses, "Bills & Utilities", "Telecommunications")),
    ("SPECTRUM", CategoryTriple::new(OperatingExpenses, "Bills & Utilities", "Internet")),
    ("DUKE-ENERGY", CategoryTriple::new(OperatingExpenses, "Bills & Utilities", "Electricity")),
    ("SPI*DUKE-ENERGY", CategoryTriple::new(OperatingExpenses, "Bills & Utilities", "Electricity")),
    ("GOV*", CategoryTriple::new(OperatingExpenses, "Bills & Utilities", "Government Fees")),
    ("STATE FARM", CategoryTriple::new(OperatingExpenses, "Bills & Utilities", "Insurance")),

    // Office & equipment
    ("RESTORATION HARDWARE", CategoryTriple::new(OperatingExpenses, "Office & Equipment", "Office Furniture")),
    ("AMAZON", CategoryTriple::new(OperatingExpenses, "Office & Equipment", "Office Supplies")),
    ("STAPLES", CategoryTriple::new(OperatingExpenses, "Office & Equipment", "Office Supplies")),
    ("APPLE STORE", CategoryTriple::new(OperatingExpenses, "Office & Equipment", "Technology Equipment")),
    ("COSTCO WHSE", CategoryTriple::new(OperatingExpenses, "Office & Equipment", "Office Supplies")),

    // Card fees
    ("ANNUAL MEMBERSHIP FEE", CategoryTriple::new(PaymentsAndFees, "Bank Fees", "Annual Fees")),
    ("INTEREST CHARGE", CategoryTriple::new(PaymentsAndFees, "Bank Fees", "Interest & Fees")),
    ("LATE FEE", CategoryTriple::new(PaymentsAndFees, "Bank Fees", "Interest & Fees")),

    // Card payments
    ("AUTOMATIC PAYMENT", CategoryTriple::new(PaymentsAndFees, "Payments", "Credit Card Payment")),
    ("PAYMENT THANK YOU", CategoryTriple::new(PaymentsAndFees, "Payments", "Credit Card Payment")),
];

const CARD_PAYMENT: CategoryTriple =
    CategoryTriple::new(PaymentsAndFees, "Payments", "Credit Card Payment");
const CARD_FEES: CategoryTriple =
    CategoryTriple::new(PaymentsAndFees, "Bank Fees", "Interest & Fees");
const TRANSFER: CategoryTriple =
    CategoryTriple::new(PaymentsAndFees, "Transfers", "Account Transfer");
const TEST_CHARGE: CategoryTriple = CategoryTriple::new(Excluded, "Excluded", "Test Transaction");
const CLIENT_MEALS: CategoryTriple =
    CategoryTriple::new(MealsAndEntertainment, "Meals & Entertainment", "Client Meals");
const SUBSCRIPTION: CategoryTriple = CategoryTriple::new(
    OperatingExpenses,
    "Software & Subscriptions",
    "Subscription Services",
);
pub const UNCATEGORIZED: CategoryTriple =
    CategoryTriple::new(Uncategorized, "Miscellaneous", "Uncategorized");

const RESTAURANT_WORDS: &[&str] = &[
    "RESTAURANT",
    "GRILL",
    "BISTRO",
    "CAFE",
    "STEAKHOUSE",
    "TAVERN",
];

/// Classify a card transaction from its description and (optional) amount.
///
/// Priority: vendor table > test-charge filter > payment/fee/transfer keywords
/// > restaurant keywords > starred subscription descriptors > uncategorized.
pub fn categorize_credit_card_transaction(description: &str, amount: Option<f64>) -> CategoryTriple {
    let desc = description.to_uppercase();

    if let Some((_, triple)) = VENDOR_TABLE.iter().find(|(vendor, _)| desc.contains(vendor)) {
        return *triple;
    }

    // Self-payments and card verification pings
    if let Some(amount) = amount {
        if amount.abs() <= 1.0 && (desc.contains("MARKMAN GROUP") || desc.contains("TEST")) {
            return TEST_CHARGE;
        }
    }

    if desc.contains("PAYMENT") || desc.contains("AUTOPAY") {
        return CARD_PAYMENT;
    }

    if desc.contains("INTEREST") || desc.contains("FEE") || desc.contains("ANNUAL") {
        return CARD_FEES;
    }

    if desc.contains("TRANSFER") {
        return TRANSFER;
    }

    if RESTAURANT_WORDS.iter().any(|w| desc.contains(w)) {
        return CLIENT_MEALS;
    }

    if desc.contains('*')
        && (desc.contains("SUBSCRIPTION") || desc.contains("MONTHLY") || desc.contains("ANNUAL"))
    {
        return SUBSCRIPTION;
    }

    UNCATEGORIZED
}

/// Vendor name for display: the matching table key, else the first token.
pub fn extract_vendor(description: &str) -> String {
    let desc = description.trim().to_uppercase();

    if let Some((vendor, _)) = VENDOR_TABLE.iter().find(|(vendor, _)| desc.contains(vendor)) {
        return (*vendor).to_string();
    }

    match desc
        .split(|c: char| c.is_whitespace() || c == '*' || c == '-')
        .next()
    {
        Some(word) if word.chars().count() > 2 => word.to_string(),
        _ => "Unknown".to_string(),
    }
}
