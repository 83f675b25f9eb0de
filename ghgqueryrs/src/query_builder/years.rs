/// Year columns of a dataset spanning `[min_year, max_year]` that fall inside
/// `[start_year, end_year]`, ascending.
///
/// An inverted or disjoint request range yields an empty list rather than an error.
pub fn resolve_years(min_year: i32, max_year: i32, start_year: i32, end_year: i32) -> Vec<String> {
    (min_year..=max_year)
        .filter(|year| (start_year..=end_year).contains(year))
        .map(|year| year.to_string())
        .collect()
}
