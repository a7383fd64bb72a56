use core::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Depth assumed when a mode string omits it
pub const DEFAULT_DEPTH: u32 = 32;
/// Refresh rate assumed when a mode string omits it
pub const DEFAULT_REFRESH_RATE: f64 = 60.0;

/// Identifies an active display (a `CGDirectDisplayID` on macOS)
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct DisplayId(pub u32);

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A mode reported by the operating system for a display
#[derive(Debug, Copy, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DisplayMode {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub refresh_rate: f64,
    #[serde(skip)]
    pub flags: ModeFlags,
}

impl DisplayMode {
    /// Creates a mode without any flags set
    pub fn new(width: u32, height: u32, depth: u32, refresh_rate: f64) -> Self {
        Self {
            width,
            height,
            depth,
            refresh_rate,
            flags: ModeFlags::default(),
        }
    }

    /// Whether all four fields are exactly equal to the request.
    ///
    /// The refresh rate is compared bit for bit: a display reporting 59.94Hz never matches `60`.
    pub fn matches(&self, request: &ModeRequest) -> bool {
        self.width == request.width
            && self.height == request.height
            && self.depth == request.depth
            && self.refresh_rate == request.refresh_rate
    }
}

impl AsRef<DisplayMode> for DisplayMode {
    fn as_ref(&self) -> &DisplayMode {
        self
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}x{}@{:.0}",
            self.width, self.height, self.depth, self.refresh_rate
        )
    }
}

/// IOKit display mode flags together with the desktop usability bit
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ModeFlags {
    pub io_flags: u32,
    pub usable_for_desktop: bool,
}

impl ModeFlags {
    pub const VALID: u32 = 0x0000_0001;
    pub const SAFE: u32 = 0x0000_0002;
    pub const DEFAULT: u32 = 0x0000_0004;
    pub const ALWAYS_SHOW: u32 = 0x0000_0008;
    pub const NOT_RESIZE: u32 = 0x0000_0010;
    pub const REQUIRES_PAN: u32 = 0x0000_0020;
    pub const INTERLACED: u32 = 0x0000_0040;
    pub const NEVER_SHOW: u32 = 0x0000_0080;
    pub const SIMULSCAN: u32 = 0x0000_0100;
    pub const NOT_PRESET: u32 = 0x0000_0200;
    pub const BUILT_IN: u32 = 0x0000_0400;
    pub const STRETCHED: u32 = 0x0000_0800;
    pub const NOT_GRAPHICS_QUALITY: u32 = 0x0000_1000;
    pub const VALIDATE_AGAINST_DISPLAY: u32 = 0x0000_2000;
    pub const TELEVISION: u32 = 0x0010_0000;
    pub const VALID_FOR_MIRRORING: u32 = 0x0020_0000;
    /// Any of valid, safe or default
    pub const SAFETY: u32 = Self::VALID | Self::SAFE | Self::DEFAULT;

    const NAMED: [(&'static str, u32); 17] = [
        ("valid", Self::VALID),
        ("safe", Self::SAFE),
        ("default", Self::DEFAULT),
        ("safety", Self::SAFETY),
        ("alwaysshow", Self::ALWAYS_SHOW),
        ("nevershow", Self::NEVER_SHOW),
        ("notresize", Self::NOT_RESIZE),
        ("requirepan", Self::REQUIRES_PAN),
        ("interlaced", Self::INTERLACED),
        ("simulscan", Self::SIMULSCAN),
        ("builtin", Self::BUILT_IN),
        ("notpreset", Self::NOT_PRESET),
        ("stretched", Self::STRETCHED),
        ("notgfxqual", Self::NOT_GRAPHICS_QUALITY),
        ("validagainstdisplay", Self::VALIDATE_AGAINST_DISPLAY),
        ("tv", Self::TELEVISION),
        ("validformirroring", Self::VALID_FOR_MIRRORING),
    ];

    pub fn has(&self, flag: u32) -> bool {
        self.io_flags & flag != 0
    }
}

impl fmt::Display for ModeFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "usable:{}", u8::from(self.usable_for_desktop))?;
        for (name, flag) in Self::NAMED {
            write!(f, " {}:{}", name, u8::from(self.has(flag)))?;
        }
        write!(f, " ioflags:{:#x}", self.io_flags)
    }
}

/// Pixel encoding classes a display mode can report
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PixelEncoding {
    Float32,
    Direct64,
    Float16,
    Direct32,
    Direct30,
    Direct16,
    Indexed8,
    Unknown,
}

impl PixelEncoding {
    /// IOKit descriptor strings, as returned by `CGDisplayModeCopyPixelEncoding`
    const DESCRIPTORS: [(&'static str, PixelEncoding); 7] = [
        ("-32FR32FG32FB32", PixelEncoding::Float32),
        ("-16R16G16B16", PixelEncoding::Direct64),
        ("-16FR16FG16FB16", PixelEncoding::Float16),
        ("--------RRRRRRRRGGGGGGGGBBBBBBBB", PixelEncoding::Direct32),
        ("--RRRRRRRRRRGGGGGGGGGGBBBBBBBBBB", PixelEncoding::Direct30),
        ("-RRRRRGGGGGBBBBB", PixelEncoding::Direct16),
        ("PPPPPPPP", PixelEncoding::Indexed8),
    ];

    /// Classifies a descriptor, ignoring ASCII case. Never fails.
    pub fn from_descriptor(descriptor: &str) -> Self {
        Self::DESCRIPTORS
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(descriptor))
            .map(|(_, encoding)| *encoding)
            .unwrap_or(PixelEncoding::Unknown)
    }

    /// Bits per pixel; 0 for an unrecognised encoding
    pub fn depth(self) -> u32 {
        // the float depths are a convention, not a real pixel size
        match self {
            PixelEncoding::Float32 => 96,
            PixelEncoding::Direct64 => 64,
            PixelEncoding::Float16 => 48,
            PixelEncoding::Direct32 => 32,
            PixelEncoding::Direct30 => 30,
            PixelEncoding::Direct16 => 16,
            PixelEncoding::Indexed8 => 8,
            PixelEncoding::Unknown => 0,
        }
    }
}

/// The configuration a user asked for
#[derive(Debug, Copy, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModeRequest {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub refresh_rate: f64,
}

impl ModeRequest {
    pub fn new(width: u32, height: u32, depth: u32, refresh_rate: f64) -> Self {
        Self {
            width,
            height,
            depth,
            refresh_rate,
        }
    }

    /// Parses a mode string, reporting which fields were filled in with defaults.
    ///
    /// Accepted forms, tried in order: `WxHxD@R`, `WxHxD`, `WxH`. Anything after the
    /// last matched field is ignored, so `1920x1080x32@` falls through to `WxHxD`. A rate
    /// that follows `@` but is not a non-negative number is rejected rather than defaulted.
    pub fn parse(s: &str) -> std::result::Result<(Self, Defaulted), ParseModeError> {
        if let Some(request) = parse_full(s)? {
            return Ok((request, Defaulted::Nothing));
        }
        if let Some(request) = parse_without_rate(s) {
            return Ok((request, Defaulted::RefreshRate));
        }
        if let Some(request) = parse_size_only(s) {
            return Ok((request, Defaulted::DepthAndRefreshRate));
        }
        Err(ParseModeError::Unparsable(s.to_string()))
    }
}

impl fmt::Display for ModeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}x{}@{}",
            self.width, self.height, self.depth, self.refresh_rate
        )
    }
}

impl FromStr for ModeRequest {
    type Err = ParseModeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s).map(|(request, _)| request)
    }
}

/// Which fields of a mode string were defaulted
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Defaulted {
    Nothing,
    RefreshRate,
    DepthAndRefreshRate,
}

impl Defaulted {
    /// Message telling the user which values were assumed
    pub fn advisory(self) -> Option<&'static str> {
        match self {
            Defaulted::Nothing => None,
            Defaulted::RefreshRate => Some("no refresh rate specified, assuming 60.0Hz."),
            Defaulted::DepthAndRefreshRate => Some(
                "no pixel-depth and no refresh rate specified, assuming 32 bit and 60.0Hz.",
            ),
        }
    }
}

/// Errors that occur while parsing a mode string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseModeError {
    #[error("the mode '{0}' couldn't be parsed. Expected format: <width>x<height>[x<depth>[@<rate>]]")]
    Unparsable(String),
    #[error("the refresh rate in mode '{0}' must be a non-negative number")]
    InvalidRefreshRate(String),
}

/// `Ok(None)` when the string ends before a rate; a rate that is there but unreadable is an error
fn parse_full(s: &str) -> std::result::Result<Option<ModeRequest>, ParseModeError> {
    let mut scan = Scanner::new(s);
    let Some((width, height, depth)) = scan_size_and_depth(&mut scan) else {
        return Ok(None);
    };
    if scan.literal('@').is_none() || scan.at_end() {
        return Ok(None);
    }
    let refresh_rate = scan
        .real()
        .ok_or_else(|| ParseModeError::InvalidRefreshRate(s.to_string()))?;
    Ok(Some(ModeRequest::new(width, height, depth, refresh_rate)))
}

fn parse_without_rate(s: &str) -> Option<ModeRequest> {
    let mut scan = Scanner::new(s);
    let (width, height, depth) = scan_size_and_depth(&mut scan)?;
    Some(ModeRequest::new(width, height, depth, DEFAULT_REFRESH_RATE))
}

fn scan_size_and_depth(scan: &mut Scanner<'_>) -> Option<(u32, u32, u32)> {
    let width = scan.unsigned()?;
    scan.literal('x')?;
    let height = scan.unsigned()?;
    scan.literal('x')?;
    let depth = scan.unsigned()?;
    Some((width, height, depth))
}

fn parse_size_only(s: &str) -> Option<ModeRequest> {
    let mut scan = Scanner::new(s);
    let width = scan.unsigned()?;
    scan.literal('x')?;
    let height = scan.unsigned()?;
    Some(ModeRequest::new(
        width,
        height,
        DEFAULT_DEPTH,
        DEFAULT_REFRESH_RATE,
    ))
}

/// Reads numbers and separators off the front of a string, scanf style
struct Scanner<'a> {
    rest: &'a str,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self { rest: input }
    }

    fn literal(&mut self, expected: char) -> Option<()> {
        self.rest = self.rest.strip_prefix(expected)?;
        Some(())
    }

    fn at_end(&self) -> bool {
        skip_whitespace(self.rest).is_empty()
    }

    fn unsigned(&mut self) -> Option<u32> {
        let input = skip_whitespace(self.rest);
        let len = digits(input);
        let value = input[..len].parse().ok()?;
        self.rest = &input[len..];
        Some(value)
    }

    /// An unsigned decimal real with an optional leading `+`
    fn real(&mut self) -> Option<f64> {
        let input = skip_whitespace(self.rest);
        let input = input.strip_prefix('+').unwrap_or(input);
        let bytes = input.as_bytes();

        let mut len = digits(input);
        let mut mantissa = len;
        if bytes.get(len) == Some(&b'.') {
            let fraction = digits(&input[len + 1..]);
            mantissa += fraction;
            len += 1 + fraction;
        }
        if mantissa == 0 {
            return None;
        }

        if matches!(bytes.get(len), Some(b'e' | b'E')) {
            let mut end = len + 1;
            if matches!(bytes.get(end), Some(b'+' | b'-')) {
                end += 1;
            }
            let exponent = digits(&input[end..]);
            if exponent > 0 {
                len = end + exponent;
            }
        }

        let value = input[..len].parse().ok()?;
        self.rest = &input[len..];
        Some(value)
    }
}

/// scanf only skips ASCII whitespace
fn skip_whitespace(s: &str) -> &str {
    s.trim_start_matches(|c: char| c.is_ascii_whitespace())
}

fn digits(s: &str) -> usize {
    s.bytes().take_while(u8::is_ascii_digit).count()
}
