//! Fixed description-to-code tables used when deriving short codes.

pub fn vehicle_class_code(description: &str) -> Option<&'static str> {
    let code = match description.trim().to_ascii_lowercase().as_str() {
        "motorbikes up to 200cc" => "1",
        "motorbikes over 200cc or with a sidecar" => "2",
        "3 wheelers" => "3",
        "mot class 4" => "4",
        "mot class 5" => "5",
        "mot class 7" => "7",
        "small psv (ie: less than or equal to 22 seats)" => "s",
        "large psv(ie: greater than 23 seats)" => "l",
        "heavy goods vehicle" => "v",
        "trailer" => "t",
        "not applicable" => "n",
        _ => return None,
    };
    Some(code)
}

pub fn body_type_code(description: &str) -> Option<&'static str> {
    let code = match description.trim().to_ascii_lowercase().as_str() {
        "articulated" => "a",
        "box" => "b",
        "refrigerated" => "c",
        "double decker" => "d",
        "car transporter" => "e",
        "flat" => "f",
        "tractor" => "h",
        "skeletal" => "k",
        "livestock carrier" => "l",
        "mini bus" => "m",
        "coach" => "n",
        "other" => "x",
        "petrol/oil tanker" => "p",
        "refuse" => "r",
        "single decker" => "s",
        "tipper" => "t",
        "curtainsider" => "u",
        "other tanker" => "y",
        "low loader" => "l",
        _ => return None,
    };
    Some(code)
}

/// The original brake code is the last three characters of the full code.
pub fn brake_code_original(brake_code: &str) -> String {
    let chars: Vec<char> = brake_code.trim().chars().collect();
    let start = chars.len().saturating_sub(3);
    chars[start..].iter().collect()
}
