use rand::Rng;

/// Builds a business id: `STU`, the last three digits of the phone number,
/// two initials from the name, then four random digits.
///
/// The random tail means two calls with the same inputs usually differ,
/// but nothing here guarantees uniqueness.
pub fn generate_student_id(name: &str, phone: Option<i64>, rng: &mut impl Rng) -> String {
    let phone = phone.map(|phone| phone.to_string()).unwrap_or_default();
    let padded = format!("{phone:0>3}");
    let phone_suffix = &padded[padded.len() - 3..];

    let upper = name.to_uppercase();
    let mut chars = upper.chars();
    let initials: String = match (chars.next(), chars.next()) {
        (Some(first), Some(second)) => [first, second].into_iter().collect(),
        (Some(first), None) => [first, 'X'].into_iter().collect(),
        (None, _) => "XX".to_string(),
    };

    let random_suffix: u16 = rng.random_range(0..10_000);

    format!("STU{phone_suffix}{initials}{random_suffix:04}")
}
