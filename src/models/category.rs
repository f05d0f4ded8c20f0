//! The closed category schema for market-data records.
//!
//! This list is part of the external contract: downstream consumers depend
//! on these key names. Crawlers, extractors, refiners, and writers all
//! enumerate the same static slice. Descriptions carry a `[hotelName]`
//! placeholder substituted at prompt-build time.

/// One entry of the category schema.
#[derive(Debug, Clone, Copy)]
pub struct Category {
    /// Stable identifier, also the database column name.
    pub name: &'static str,
    /// Human/LLM-facing description. May contain `[hotelName]`.
    pub description: &'static str,
    /// Extra guidance for the per-page extractor.
    pub capture_guide: Option<&'static str>,
    /// Extra guidance for the per-field refiner.
    pub merge_guide: Option<&'static str>,
}

/// Name of the catch-all category.
pub const OTHER_CATEGORY: &str = "other";

static CATEGORIES: &[Category] = &[
    Category {
        name: "basic_information",
        description: "General identifying information about [hotelName]: official name, brand or chain affiliation, star rating, year built or renovated, number of floors and rooms, and a short overall description.",
        capture_guide: None,
        merge_guide: None,
    },
    Category {
        name: "contacts",
        description: "Contact details for [hotelName]: street address, phone numbers, email addresses, social media handles, and official website references.",
        capture_guide: Some("Copy phone numbers, emails, and addresses exactly as written."),
        merge_guide: Some("Prefer the most complete address form; keep every distinct phone number and email."),
    },
    Category {
        name: "accessibility",
        description: "Accessibility features at [hotelName]: wheelchair access, accessible rooms and bathrooms, elevators, hearing or visual assistance, service animal policy.",
        capture_guide: None,
        merge_guide: None,
    },
    Category {
        name: "amenities",
        description: "Property-wide amenities at [hotelName]: pools, spas, lounges, gift shops, concierge, and any other guest-facing facilities.",
        capture_guide: Some("Keep amenity lists as comma-separated text; do not summarize a list into a vague phrase."),
        merge_guide: Some("Union the amenity lists; never drop a named amenity."),
    },
    Category {
        name: "cleanliness_enhancements",
        description: "Enhanced cleaning protocols at [hotelName]: sanitization programs, certifications, contactless options, and health safety measures.",
        capture_guide: None,
        merge_guide: None,
    },
    Category {
        name: "food_beverage",
        description: "Dining at [hotelName]: restaurants, bars, cafes, room service, breakfast offerings, with names, cuisines, and hours where stated.",
        capture_guide: Some("Keep restaurant and bar names verbatim."),
        merge_guide: Some("Keep every named outlet; prefer newer hours over older ones."),
    },
    Category {
        name: "guest_rooms",
        description: "Guest rooms and suites at [hotelName]: room types, bedding, views, in-room amenities, square footage, and rates where published.",
        capture_guide: Some("Keep room type names and prices exactly as written."),
        merge_guide: Some("Keep all room types; on price conflicts prefer the newer figure."),
    },
    Category {
        name: "guest_services_front_desk",
        description: "Front desk and guest services at [hotelName]: hours, check-in/check-out times, luggage storage, wake-up calls, multilingual staff.",
        capture_guide: None,
        merge_guide: None,
    },
    Category {
        name: "housekeeping_laundry",
        description: "Housekeeping and laundry services at [hotelName]: housekeeping frequency, laundry, dry cleaning, ironing facilities.",
        capture_guide: None,
        merge_guide: None,
    },
    Category {
        name: "local_area_information",
        description: "The area around [hotelName]: nearby attractions, landmarks, restaurants, distances to airports and transit, neighborhood description.",
        capture_guide: Some("Keep place names and distances verbatim."),
        merge_guide: Some("Never drop or generalize a named place."),
    },
    Category {
        name: "meeting_events",
        description: "Meeting and event facilities at [hotelName]: ballrooms, meeting rooms, capacities, catering, wedding and conference services.",
        capture_guide: None,
        merge_guide: None,
    },
    Category {
        name: "on_property_convenience",
        description: "Convenience services on the property of [hotelName]: ATMs, vending machines, convenience stores, currency exchange, ice machines.",
        capture_guide: None,
        merge_guide: None,
    },
    Category {
        name: "parking_transportation",
        description: "Parking and transportation at [hotelName]: self and valet parking with fees, EV charging, airport shuttles, car rental, public transit access.",
        capture_guide: Some("Keep parking fees and shuttle schedules exactly as written."),
        merge_guide: Some("On fee conflicts prefer the newer figure."),
    },
    Category {
        name: "policies",
        description: "Policies of [hotelName]: check-in/check-out times, cancellation, deposits, pets, smoking, age requirements, payment methods.",
        capture_guide: Some("Copy policy wording exactly; do not soften or generalize restrictions."),
        merge_guide: Some("On yes/no or numeric policy conflicts prefer the newer statement."),
    },
    Category {
        name: "recreation_fitness",
        description: "Recreation and fitness at [hotelName]: gyms, pools, tennis, golf, water sports, kids' activities, and their hours or fees.",
        capture_guide: None,
        merge_guide: None,
    },
    Category {
        name: "safety_security",
        description: "Safety and security at [hotelName]: smoke detectors, sprinklers, safes, security staff, key card access, CCTV.",
        capture_guide: None,
        merge_guide: None,
    },
    Category {
        name: "technology_business_services",
        description: "Technology and business services at [hotelName]: WiFi coverage and fees, business center, printing, AV equipment, smart TVs.",
        capture_guide: None,
        merge_guide: None,
    },
    Category {
        name: "faq",
        description: "Frequently asked questions published by [hotelName], with their answers.",
        capture_guide: Some("Copy each question and answer verbatim. Do not paraphrase, shorten, or merge Q/A pairs."),
        merge_guide: Some("Keep every distinct Q/A pair verbatim; replace an answer only when the newer text answers the same question differently."),
    },
    Category {
        name: "other",
        description: "Any other factual information about [hotelName] that does not fit the categories above: loyalty programs, awards, sustainability, history.",
        capture_guide: None,
        merge_guide: None,
    },
];

/// The full category schema, in declaration order.
pub fn categories() -> &'static [Category] {
    CATEGORIES
}

/// All category names, in declaration order.
pub fn category_names() -> impl Iterator<Item = &'static str> {
    CATEGORIES.iter().map(|c| c.name)
}

/// Look up a category by name.
pub fn find_category(name: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_schema_is_closed_and_stable() {
        assert_eq!(categories().len(), 19);
        assert_eq!(categories().first().unwrap().name, "basic_information");
        assert_eq!(categories().last().unwrap().name, OTHER_CATEGORY);
    }

    #[test]
    fn test_names_unique_and_snake_case() {
        let names: HashSet<_> = category_names().collect();
        assert_eq!(names.len(), 19);
        for name in category_names() {
            assert!(name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c == '_'));
        }
    }

    #[test]
    fn test_descriptions_carry_hotel_name_placeholder() {
        for cat in categories() {
            assert!(
                cat.description.contains("[hotelName]"),
                "{} lacks placeholder",
                cat.name
            );
        }
    }

    #[test]
    fn test_other_has_no_field_guides() {
        let other = find_category(OTHER_CATEGORY).unwrap();
        assert!(other.capture_guide.is_none());
        assert!(other.merge_guide.is_none());
    }
}
