/// Display name for a location code, or `None` for unknown codes.
pub fn location_name(code: &str) -> Option<&'static str> {
    let name = match code.trim().to_ascii_lowercase().as_str() {
        "downtown" => "Downtown Station Area",
        "main-street" => "Main Street Railway Crossing",
        "industrial" => "Industrial Zone Crossing",
        "bridge-road" => "Bridge Road Junction",
        "city-center" => "City Center Crossing",
        "highway" => "Highway Bypass Crossing",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_unknown_codes() {
        assert_eq!(location_name("main-street"), Some("Main Street Railway Crossing"));
        assert_eq!(location_name(" Downtown "), Some("Downtown Station Area"));
        assert_eq!(location_name("atlantis"), None);
    }
}
