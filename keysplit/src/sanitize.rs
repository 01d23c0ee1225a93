/// Maps a canonical key to a file name fragment.
///
/// Every character outside `a-z` and `A-Z` becomes one underscore, so the fragment has as many
/// characters as the key. Distinct keys can map to the same fragment.
pub fn sanitize(canonical: &str) -> String {
    canonical
        .chars()
        .map(|c| if c.is_ascii_alphabetic() { c } else { '_' })
        .collect()
}
