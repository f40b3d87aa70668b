//! Morse code generation (§4.4 step 4 "ID / ID1 / IDTALKOVER: ... send
//! Morse over TX (speed, frequency, amplitude from `[morse]` config
//! section)"). Produces a tone/silence timeline rather than raw PCM; the
//! node loop's tone generator renders each element.

use crate::config::MorseConfig;

/// One element of a rendered Morse timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    /// Tone on for `ms` milliseconds at the configured frequency.
    Tone { ms: u32 },
    /// Silence for `ms` milliseconds (inter-element, inter-letter, or
    /// inter-word gap).
    Silence { ms: u32 },
}

fn pattern(c: char) -> Option<&'static str> {
    Some(match c.to_ascii_uppercase() {
        'A' => ".-",
        'B' => "-...",
        'C' => "-.-.",
        'D' => "-..",
        'E' => ".",
        'F' => "..-.",
        'G' => "--.",
        'H' => "....",
        'I' => "..",
        'J' => ".---",
        'K' => "-.-",
        'L' => ".-..",
        'M' => "--",
        'N' => "-.",
        'O' => "---",
        'P' => ".--.",
        'Q' => "--.-",
        'R' => ".-.",
        'S' => "...",
        'T' => "-",
        'U' => "..-",
        'V' => "...-",
        'W' => ".--",
        'X' => "-..-",
        'Y' => "-.--",
        'Z' => "--..",
        '0' => "-----",
        '1' => ".----",
        '2' => "..---",
        '3' => "...--",
        '4' => "....-",
        '5' => ".....",
        '6' => "-....",
        '7' => "--...",
        '8' => "---..",
        '9' => "----.",
        '/' => "-..-.",
        '?' => "..--..",
        '.' => ".-.-.-",
        ',' => "--..--",
        _ => return None,
    })
}

/// PARIS-standard dit length in milliseconds for `speed` words per minute.
fn dit_ms(speed: u32) -> u32 {
    if speed == 0 {
        return 100;
    }
    1200 / speed
}

/// Render `text` into a timeline of tone/silence elements at `config`'s
/// speed. Unknown characters are treated as a word space. A space character
/// in `text` is also a word space.
pub fn render(text: &str, config: &MorseConfig) -> Vec<Element> {
    let dit = dit_ms(config.speed);
    let mut out = Vec::new();
    let mut first_in_word = true;
    for c in text.chars() {
        if c == ' ' {
            out.push(Element::Silence { ms: dit * 7 });
            first_in_word = true;
            continue;
        }
        let Some(p) = pattern(c) else {
            out.push(Element::Silence { ms: dit * 7 });
            first_in_word = true;
            continue;
        };
        if !first_in_word {
            out.push(Element::Silence { ms: dit * 3 });
        }
        first_in_word = false;
        for (i, mark) in p.chars().enumerate() {
            if i > 0 {
                out.push(Element::Silence { ms: dit });
            }
            let ms = if mark == '-' { dit * 3 } else { dit };
            out.push(Element::Tone { ms });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> MorseConfig {
        MorseConfig { speed: 20, ..MorseConfig::default() }
    }

    #[test]
    fn dit_length_follows_paris_standard() {
        assert_eq!(dit_ms(20), 60);
    }

    #[test]
    fn renders_single_letter_e() {
        let elems = render("E", &cfg());
        assert_eq!(elems, vec![Element::Tone { ms: 60 }]);
    }

    #[test]
    fn renders_letter_gap_between_two_letters() {
        let elems = render("EE", &cfg());
        assert_eq!(elems, vec![
            Element::Tone { ms: 60 },
            Element::Silence { ms: 180 },
            Element::Tone { ms: 60 },
        ]);
    }

    #[test]
    fn renders_t_as_a_dah() {
        let elems = render("T", &cfg());
        assert_eq!(elems, vec![Element::Tone { ms: 180 }]);
    }

    #[test]
    fn word_space_uses_seven_dits() {
        let elems = render("E E", &cfg());
        assert!(elems.contains(&Element::Silence { ms: 420 }));
    }
}
