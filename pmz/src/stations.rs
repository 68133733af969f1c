//! The `Stations` and `Driving` strings of a `.trp` line section are two
//! parallel mini-languages walked in lockstep. `Stations` lists station names
//! separated by commas, with `(...)` groups marking branches that hang off the
//! last trunk station, quoting making separators literal, and a `-` prefix
//! flagging a reverse-direction connection. `Driving` lists the travel time
//! of each hop in the same order, with `(...)` blocks either supplying the
//! per-member times of a branch group or an independent
//! `(forward, backward)` pair for one hop.

use std::cmp::Ordering;

use crate::values::as_delay;

const SEPARATORS: [char; 3] = [',', '(', ')'];

#[derive(Clone, Debug, PartialEq)]
pub enum StationToken {
    BranchOpen,
    BranchClose,
    Station {
        name: String,
        display_name: String,
        reverse: bool,
        in_branch: bool,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParsedStation {
    pub name: String,
    pub display_name: String,
}

/// A directed hop between two stations of one line, by index into the parsed
/// station list. Both directions of a track are recorded separately; they
/// get normalized into one drawable segment at scheme-binding time.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedSegment {
    pub from: usize,
    pub to: usize,
    pub delay: Option<f64>,
}

/// Tokenizes a `Stations` string. Station names repeated on the trunk are
/// disambiguated with a counted `:X:` suffix; branch-group members are left
/// untouched since they usually reference trunk stations (loops and forks).
pub fn tokenize_stations(text: &str) -> Vec<StationToken> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut seen: Vec<String> = Vec::new();
    let mut in_branch = false;
    let mut pos = 0;

    loop {
        // Skip separators up to the next token, noting branch boundaries. A
        // lone comma stops the skip so that `a,,b` yields an empty token.
        while pos < chars.len() {
            let symbol = chars[pos];
            if !SEPARATORS.contains(&symbol) {
                break;
            }
            if symbol == '(' {
                pos += 1;
                tokens.push(StationToken::BranchOpen);
                in_branch = true;
                break;
            }
            if symbol == ')' {
                tokens.push(StationToken::BranchClose);
                in_branch = false;
            }
            pos += 1;
            if symbol == ',' && chars.get(pos) != Some(&'(') {
                break;
            }
        }
        if pos >= chars.len() {
            break;
        }
        if SEPARATORS.contains(&chars[pos]) {
            // The skip stopped on a separator: an empty token between commas.
            tokens.push(StationToken::Station {
                name: String::new(),
                display_name: String::new(),
                reverse: false,
                in_branch,
            });
            continue;
        }

        let start = pos;
        let mut quotes = false;
        while pos < chars.len() {
            let c = chars[pos];
            if SEPARATORS.contains(&c) && !quotes {
                break;
            }
            if c == '"' {
                quotes = !quotes;
            }
            pos += 1;
        }
        let mut txt: String = chars[start..pos].iter().collect();

        let mut reverse = false;
        if let Some(stripped) = txt.strip_prefix('-') {
            reverse = true;
            txt = stripped.to_string();
        } else if let Some(stripped) = txt.strip_prefix("\"-") {
            reverse = true;
            txt = format!("\"{}", stripped);
        }

        // Quotes only delimit; names are stored unquoted so they line up
        // with the references in Transfers and AdditionalNodes entries.
        let mut name: String = txt.chars().filter(|c| *c != '"').collect();
        let display_name = name.clone();

        if !in_branch && !name.is_empty() {
            if seen.contains(&name) {
                let mut counter = 1;
                let mut candidate = format!("{}:X:{}", name, counter);
                while seen.contains(&candidate) {
                    counter += 1;
                    candidate = format!("{}:X:{}", name, counter);
                }
                error!("Station '{}' already been found, used '{}'.", name, candidate);
                name = candidate;
            }
            seen.push(name.clone());
        }

        tokens.push(StationToken::Station {
            name,
            display_name,
            reverse,
            in_branch,
        });
    }

    tokens
}

/// The `Driving` side of the walk: comma-separated scalars, with `(...)`
/// blocks consumed whole.
pub struct DelaysCursor {
    chars: Vec<char>,
    pos: usize,
}

impl DelaysCursor {
    pub fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    pub fn begin_bracket(&self) -> bool {
        self.chars.get(self.pos) == Some(&'(')
    }

    fn next_block(&mut self) -> String {
        let search_from = if self.begin_bracket() {
            self.chars[self.pos..]
                .iter()
                .position(|c| *c == ')')
                .map(|i| self.pos + i)
                .unwrap_or(self.pos)
        } else {
            self.pos
        };
        match self.chars[search_from..].iter().position(|c| *c == ',') {
            Some(i) => {
                let comma = search_from + i;
                let block: String = self.chars[self.pos..comma].iter().collect();
                self.pos = comma + 1;
                block
            }
            None => {
                let block: String = self.chars[self.pos..].iter().collect();
                self.pos = self.chars.len();
                block
            }
        }
    }

    pub fn next_scalar(&mut self) -> Option<f64> {
        let block = self.next_block();
        if block.is_empty() {
            return None;
        }
        as_delay(&block)
    }

    pub fn next_bracket(&mut self) -> Vec<Option<f64>> {
        let block = self.next_block();
        let mut inner = block.as_str();
        inner = inner.strip_prefix('(').unwrap_or(inner);
        inner = inner.strip_suffix(')').unwrap_or(inner);
        inner.split(',').map(as_delay).collect()
    }
}

/// Reconstructs a line's station list and directed segment list from its
/// `Stations`/`Driving` pair.
pub fn parse_stations_and_delays(
    stations_text: &str,
    driving_text: &str,
) -> (Vec<ParsedStation>, Vec<ParsedSegment>) {
    let tokens = tokenize_stations(stations_text);
    let stations = station_list(&tokens);
    if stations.len() < 2 && driving_text.is_empty() {
        return (stations, Vec::new());
    }

    let resolve = |name: &str| stations.iter().position(|s| s.name == name);
    let mut delays = DelaysCursor::new(driving_text);
    let mut segments: Vec<ParsedSegment> = Vec::new();

    let mut idx = 0;
    let mut current = loop {
        if idx >= tokens.len() {
            return (stations, segments);
        }
        if let StationToken::Station { name, .. } = &tokens[idx] {
            idx += 1;
            if let Some(i) = resolve(name) {
                break i;
            }
        } else {
            idx += 1;
        }
    };

    let mut from_station: Option<usize> = None;
    let mut from_delay: Option<f64> = None;

    while idx < tokens.len() {
        match &tokens[idx] {
            StationToken::BranchOpen => {
                idx += 1;
                let bracket = delays.next_bracket();
                let mut delay_idx = 0;
                while idx < tokens.len() {
                    match &tokens[idx] {
                        StationToken::BranchClose => {
                            idx += 1;
                            break;
                        }
                        StationToken::Station { name, reverse, .. } => {
                            idx += 1;
                            if !name.is_empty() {
                                let delay = bracket.get(delay_idx).copied().flatten();
                                match resolve(name) {
                                    Some(member) => {
                                        let (f, t) = if *reverse {
                                            (member, current)
                                        } else {
                                            (current, member)
                                        };
                                        if !pair_exists(&segments, f, t) {
                                            segments.push(ParsedSegment {
                                                from: f,
                                                to: t,
                                                delay,
                                            });
                                        }
                                    }
                                    None => {
                                        warn!("Unknown branch station '{}', segment skipped", name)
                                    }
                                }
                            }
                            delay_idx += 1;
                        }
                        StationToken::BranchOpen => idx += 1,
                    }
                }
                // The chain resumes from the trunk station the branch hung
                // off; the branch members never become "current".
                from_station = None;
                from_delay = None;
                if next_station(&tokens, idx).is_none() {
                    break;
                }
            }
            StationToken::BranchClose => idx += 1,
            StationToken::Station { name: to_name, .. } => {
                idx += 1;
                let to = if to_name.is_empty() {
                    warn!("Empty station token in '{}', hop skipped", stations_text);
                    None
                } else {
                    resolve(to_name)
                };

                let to_delay = if delays.begin_bracket() {
                    // An independent (forward, backward) pair for this hop.
                    let pair = delays.next_bracket();
                    from_delay = pair.get(1).copied().flatten();
                    pair.first().copied().flatten()
                } else {
                    delays.next_scalar()
                };

                if let Some(from) = from_station {
                    if from != current && !pair_exists(&segments, current, from) {
                        let mut delay = from_delay;
                        if delay.is_none() {
                            // Delays are symmetric unless independently
                            // specified; backfill from the opposite edge.
                            delay = find_pair(&segments, from, current).and_then(|s| s.delay);
                        }
                        segments.push(ParsedSegment {
                            from: current,
                            to: from,
                            delay,
                        });
                    }
                }
                if let Some(to) = to {
                    let forward = ParsedSegment {
                        from: current,
                        to,
                        delay: to_delay,
                    };
                    if !segments.contains(&forward) {
                        segments.push(forward);
                    }
                }

                from_station = Some(current);
                from_delay = to_delay;
                if let Some(to) = to {
                    current = to;
                }

                if next_station(&tokens, idx).is_none() {
                    // Trailing backward edge for the final station.
                    if let Some(from) = from_station {
                        if from != current && !pair_exists(&segments, current, from) {
                            let mut delay = from_delay;
                            if delay.is_none() {
                                delay = find_pair(&segments, from, current).and_then(|s| s.delay);
                            }
                            segments.push(ParsedSegment {
                                from: current,
                                to: from,
                                delay,
                            });
                        }
                    }
                    break;
                }
            }
        }
    }

    segments.sort_by(compare_segments);
    (stations, segments)
}

/// Every first occurrence of a station name, in string order. Branch members
/// referencing a station named elsewhere resolve to it; fresh branch names
/// materialize in place so positional coordinate binding stays aligned.
fn station_list(tokens: &[StationToken]) -> Vec<ParsedStation> {
    let mut stations: Vec<ParsedStation> = Vec::new();
    for token in tokens {
        if let StationToken::Station {
            name, display_name, ..
        } = token
        {
            if name.is_empty() {
                continue;
            }
            if stations.iter().any(|s| &s.name == name) {
                continue;
            }
            stations.push(ParsedStation {
                name: name.clone(),
                display_name: display_name.clone(),
            });
        }
    }
    stations
}

fn next_station(tokens: &[StationToken], from: usize) -> Option<usize> {
    tokens[from..].iter().position(|t| matches!(t, StationToken::Station { .. }))
}

fn pair_exists(segments: &[ParsedSegment], from: usize, to: usize) -> bool {
    segments.iter().any(|s| s.from == from && s.to == to)
}

fn find_pair(segments: &[ParsedSegment], from: usize, to: usize) -> Option<&ParsedSegment> {
    segments.iter().find(|s| s.from == from && s.to == to)
}

fn compare_segments(a: &ParsedSegment, b: &ParsedSegment) -> Ordering {
    (a.from, a.to)
        .cmp(&(b.from, b.to))
        .then_with(|| match (a.delay, b.delay) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => x.total_cmp(&y),
        })
}
