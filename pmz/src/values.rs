//! Scalar and list decoding for the hand-authored value formats that show up
//! across `.cty`/`.trp`/`.map`/`.vec` files.

use anyhow::Result;

/// A travel time like `12.34` encodes 12 minutes 34 seconds, not decimal
/// minutes. Returns seconds; `None` for empty or unparseable text.
pub fn as_delay(text: &str) -> Option<f64> {
    let value: f64 = text.trim().parse().ok()?;
    let minutes = value.floor();
    let seconds = ((value - minutes) * 100.0).round();
    Some(minutes * 60.0 + seconds)
}

pub fn as_delay_list(text: &str) -> Vec<Option<f64>> {
    text.split(',').map(as_delay).collect()
}

/// Salvages hand-authored numeric fields: decimal commas, stray units,
/// doubled dots. Keeps digits, one dot and a leading minus.
pub fn un_bugger_for_float(text: &str) -> String {
    let mut out = String::new();
    let mut seen_dot = false;
    for c in text.trim().chars() {
        match c {
            '0'..='9' => out.push(c),
            ',' | '.' if !seen_dot => {
                out.push('.');
                seen_dot = true;
            }
            '-' if out.is_empty() => out.push('-'),
            _ => {}
        }
    }
    out
}

pub fn as_list(text: &str) -> Vec<String> {
    text.split(',').map(|p| p.trim().to_string()).collect()
}

/// Splits on commas, honoring double-quoted runs where commas are literal.
/// Items come back trimmed with the quotes removed.
pub fn as_quoted_list(text: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in text.chars() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => items.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    items.push(current);
    items.iter().map(|s| s.trim().to_string()).collect()
}

pub fn as_nullable_list_stripped(text: Option<&str>) -> Option<Vec<String>> {
    let text = text?.trim();
    if text.is_empty() {
        return None;
    }
    Some(as_list(text))
}

/// `key=value` comma pairs; entries without `=` are skipped.
pub fn as_dict(text: &str) -> std::collections::BTreeMap<String, String> {
    let mut map = std::collections::BTreeMap::new();
    for part in as_quoted_list(text) {
        if let Some(i) = part.find('=') {
            map.insert(
                part[..i].trim().to_string(),
                part[i + 1..].trim().to_string(),
            );
        }
    }
    map
}

/// Consecutive string pairs as points. A dangling odd token (like a trailing
/// `spline` flag) is ignored; a non-numeric token inside a pair is an error.
pub fn as_points(parts: &[String]) -> Result<Vec<(f64, f64)>> {
    let mut pts = Vec::new();
    for pair in parts.chunks_exact(2) {
        let x: f64 = pair[0]
            .trim()
            .parse()
            .map_err(|_| anyhow!("non-numeric point token '{}'", pair[0]))?;
        let y: f64 = pair[1]
            .trim()
            .parse()
            .map_err(|_| anyhow!("non-numeric point token '{}'", pair[1]))?;
        pts.push((x, y));
    }
    Ok(pts)
}

fn parse_coord(text: &str) -> Option<i32> {
    let text = text.trim();
    if let Ok(v) = text.parse::<i32>() {
        return Some(v);
    }
    text.parse::<f64>().ok().map(|v| v.round() as i32)
}

/// A flat `x,y,x,y,...` list chunked into pairs. An unparseable chunk yields
/// `None` at that position, so positional binding stays aligned.
pub fn as_int_point_list(text: &str) -> Vec<Option<(i32, i32)>> {
    let parts: Vec<&str> = text.split(',').collect();
    parts
        .chunks_exact(2)
        .map(|pair| Some((parse_coord(pair[0])?, parse_coord(pair[1])?)))
        .collect()
}

/// A flat `l,t,r,b,...` list chunked into rectangles.
pub fn as_int_rect_list(text: &str) -> Vec<Option<(i32, i32, i32, i32)>> {
    let parts: Vec<&str> = text.split(',').collect();
    parts
        .chunks_exact(4)
        .map(|quad| {
            Some((
                parse_coord(quad[0])?,
                parse_coord(quad[1])?,
                parse_coord(quad[2])?,
                parse_coord(quad[3])?,
            ))
        })
        .collect()
}

/// A point list with an optional trailing stroke width token.
pub fn as_point_list_with_width(text: &str) -> Result<(Vec<(f64, f64)>, f64)> {
    let parts: Vec<String> = as_list(text);
    let pts = as_points(&parts[..parts.len() / 2 * 2])?;
    let width = if parts.len() % 2 == 0 {
        1.0
    } else {
        let last = &parts[parts.len() - 1];
        if last.is_empty() {
            0.0
        } else {
            last.parse().unwrap_or(1.0)
        }
    };
    Ok((pts, width))
}

/// Colors are 6-hex-digit strings with legacy special cases.
pub fn as_rgb(text: &str) -> String {
    if text == "0" || text == "00" {
        return "#000".to_string();
    }
    if text == "-1" || text.is_empty() {
        return "none".to_string();
    }
    let chars: Vec<char> = text.chars().take(6).collect();
    if chars.len() == 6
        && chars[0] == chars[1]
        && chars[2] == chars[3]
        && chars[4] == chars[5]
    {
        return format!("#{}{}{}", chars[0], chars[2], chars[4]);
    }
    format!("#{}", chars.into_iter().collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_is_minutes_dot_seconds() {
        assert_eq!(as_delay("12.34"), Some(754.0));
        assert_eq!(as_delay("1.05"), Some(65.0));
        assert_eq!(as_delay("5"), Some(300.0));
        assert_eq!(as_delay(""), None);
        assert_eq!(as_delay("x"), None);
    }

    #[test]
    fn rgb_special_cases() {
        assert_eq!(as_rgb("000000"), "#000");
        assert_eq!(as_rgb("0"), "#000");
        assert_eq!(as_rgb("-1"), "none");
        assert_eq!(as_rgb(""), "none");
        assert_eq!(as_rgb("aabbcc"), "#abc");
        assert_eq!(as_rgb("1a2b3c"), "#1a2b3c");
        assert_eq!(as_rgb("1a2b3cff"), "#1a2b3c");
    }

    #[test]
    fn quoted_lists() {
        assert_eq!(
            as_quoted_list("a, \"b, c\" ,d"),
            vec!["a", "b, c", "d"]
        );
    }

    #[test]
    fn int_point_list_keeps_positions() {
        assert_eq!(
            as_int_point_list("1,2,x,y,5,6"),
            vec![Some((1, 2)), None, Some((5, 6))]
        );
    }

    #[test]
    fn point_list_with_width() {
        let (pts, width) = as_point_list_with_width("0,0,10,20,3").unwrap();
        assert_eq!(pts, vec![(0.0, 0.0), (10.0, 20.0)]);
        assert_eq!(width, 3.0);
        let (pts, width) = as_point_list_with_width("0,0,10,20").unwrap();
        assert_eq!(pts.len(), 2);
        assert_eq!(width, 1.0);
    }

    #[test]
    fn un_bugger_fixes_typos() {
        assert_eq!(un_bugger_for_float(" 2,5 "), "2.5");
        assert_eq!(un_bugger_for_float("1.5min"), "1.5");
        assert_eq!(un_bugger_for_float("0..15"), "0.15");
    }

    #[test]
    fn points_ignore_dangling_flag() {
        let parts: Vec<String> = vec!["1".into(), "2".into(), "3".into(), "4".into(), "spline".into()];
        assert_eq!(as_points(&parts).unwrap(), vec![(1.0, 2.0), (3.0, 4.0)]);
    }
}
