use image::Rgb;

/// Anchor colors of the sequential white-to-navy "Blues" scale
const BLUES: [[u8; 3]; 9] = [
    [247, 251, 255],
    [222, 235, 247],
    [198, 219, 239],
    [158, 202, 225],
    [107, 174, 214],
    [66, 146, 198],
    [33, 113, 181],
    [8, 81, 156],
    [8, 48, 107],
];

/// Map `t` in `[0, 1]` onto the Blues scale. Values outside are clamped, NaN maps to the low end.
pub fn blues(t: f64) -> Rgb<u8> {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let scaled = t * (BLUES.len() - 1) as f64;
    let lower = scaled.floor() as usize;
    let upper = (lower + 1).min(BLUES.len() - 1);
    let frac = scaled - lower as f64;

    let mix = |c: usize| {
        let a = BLUES[lower][c] as f64;
        let b = BLUES[upper][c] as f64;
        (a + (b - a) * frac).round() as u8
    };
    Rgb([mix(0), mix(1), mix(2)])
}

/// Position of `value` between `min` and `max`; a flat range maps to 0
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max > min {
        (value - min) / (max - min)
    } else {
        0.0
    }
}

pub fn to_hex(color: Rgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2])
}
