// TiltCue - SSD1306 OLED Display Driver
//
// 128x64 monochrome framebuffer rendered with embedded-graphics and flushed
// page by page over the shared I2C bus.

use std::convert::Infallible;
use std::fmt;

use embedded_graphics::mono_font::{ascii::FONT_6X10, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle, Rectangle, Triangle};
use embedded_graphics::text::{Alignment, Text};
use thiserror::Error;

use crate::config::*;
use crate::drivers::bus::{I2cBus, SharedBus};
use crate::events::DisplayCue;
use crate::statemachine::DisplayService;

const CONTROL_COMMAND: u8 = 0x00;
const CONTROL_DATA: u8 = 0x40;
const DATA_CHUNK: usize = 16;

const INIT_SEQUENCE: &[u8] = &[
    0xAE, // display off
    0xD5, 0x80, // clock divide
    0xA8, 0x3F, // multiplex 64
    0xD3, 0x00, // display offset
    0x40, // start line 0
    0x8D, 0x14, // charge pump on
    0x20, 0x00, // horizontal addressing
    0xA1, // segment remap
    0xC8, // COM scan descending
    0xDA, 0x12, // COM pins
    0x81, 0xCF, // contrast
    0xD9, 0xF1, // pre-charge
    0xDB, 0x40, // VCOMH deselect
    0xA4, // resume from RAM
    0xA6, // normal (not inverted)
    0xAF, // display on
];

#[derive(Debug, Error)]
pub enum DisplayError<E: fmt::Debug + fmt::Display> {
    #[error("I2C bus error: {0}")]
    Bus(E),
    #[error("I2C bus lock poisoned")]
    BusPoisoned,
}

// ---------------------------------------------------------------------------
// Framebuffer
// ---------------------------------------------------------------------------

/// SSD1306 page layout: byte `x + (y / 8) * width`, bit `y % 8`.
pub struct FrameBuffer {
    buf: [u8; DISPLAY_BUFFER_SIZE],
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            buf: [0; DISPLAY_BUFFER_SIZE],
        }
    }

    pub fn clear(&mut self) {
        self.buf.fill(0);
    }

    pub fn pixel(&self, x: u32, y: u32) -> bool {
        if x >= SCREEN_WIDTH || y >= SCREEN_HEIGHT {
            return false;
        }
        let idx = (x + (y / 8) * SCREEN_WIDTH) as usize;
        self.buf[idx] & (1 << (y % 8)) != 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(SCREEN_WIDTH, SCREEN_HEIGHT)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) else {
                continue;
            };
            if x >= SCREEN_WIDTH || y >= SCREEN_HEIGHT {
                continue;
            }
            let idx = (x + (y / 8) * SCREEN_WIDTH) as usize;
            let bit = 1 << (y % 8);
            match color {
                BinaryColor::On => self.buf[idx] |= bit,
                BinaryColor::Off => self.buf[idx] &= !bit,
            }
        }
        Ok(())
    }
}

/// Draw a cue: glyph in the upper area, label along the bottom.
pub fn render_cue(frame: &mut FrameBuffer, cue: DisplayCue) -> Result<(), Infallible> {
    frame.clear();

    let fill = PrimitiveStyle::with_fill(BinaryColor::On);
    let outline = PrimitiveStyle::with_stroke(BinaryColor::On, 2);

    let left = |dx: i32| Triangle::new(Point::new(24 + dx, 24), Point::new(48 + dx, 8), Point::new(48 + dx, 40));
    let right = |dx: i32| Triangle::new(Point::new(104 - dx, 24), Point::new(80 - dx, 8), Point::new(80 - dx, 40));
    let up = Triangle::new(Point::new(64, 4), Point::new(44, 40), Point::new(84, 40));
    let bar = Rectangle::new(Point::new(44, 10), Size::new(40, 28));

    match cue {
        DisplayCue::Idle(variant) => {
            // Road line, with the lane mark shifted per variant.
            Line::new(Point::new(16, 30), Point::new(112, 30))
                .into_styled(outline)
                .draw(frame)?;
            let mark = 16 + i32::from(variant % IDLE_VARIANT_COUNT) * 9;
            Rectangle::new(Point::new(mark, 20), Size::new(6, 6))
                .into_styled(fill)
                .draw(frame)?;
        }
        DisplayCue::TurnLeftStart => left(0).into_styled(fill).draw(frame)?,
        DisplayCue::TurnLeftHard => {
            left(0).into_styled(fill).draw(frame)?;
            left(22).into_styled(fill).draw(frame)?;
        }
        DisplayCue::TurnLeftEnd => left(0).into_styled(outline).draw(frame)?,
        DisplayCue::TurnRightStart => right(0).into_styled(fill).draw(frame)?,
        DisplayCue::TurnRightHard => {
            right(0).into_styled(fill).draw(frame)?;
            right(22).into_styled(fill).draw(frame)?;
        }
        DisplayCue::TurnRightEnd => right(0).into_styled(outline).draw(frame)?,
        DisplayCue::AccelerateStart => up.into_styled(fill).draw(frame)?,
        DisplayCue::AccelerateEnd => up.into_styled(outline).draw(frame)?,
        DisplayCue::BrakeStart => bar.into_styled(fill).draw(frame)?,
        DisplayCue::BrakeEnd => bar.into_styled(outline).draw(frame)?,
    }

    let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
    Text::with_alignment(cue.label(), Point::new(64, 58), style, Alignment::Center).draw(frame)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Device
// ---------------------------------------------------------------------------

pub struct OledDisplay<B: 'static> {
    bus: SharedBus<B>,
    frame: FrameBuffer,
}

impl<B: I2cBus + 'static> OledDisplay<B> {
    pub fn new(bus: SharedBus<B>) -> Self {
        Self {
            bus,
            frame: FrameBuffer::new(),
        }
    }

    /// Probe the controller with a no-op command.
    pub fn is_connected(&self) -> bool {
        self.command(&[0xE3]).is_ok()
    }

    pub fn init(&mut self) -> Result<(), DisplayError<B::Error>> {
        self.command(INIT_SEQUENCE)?;
        self.frame.clear();
        self.flush()?;
        log::info!("SSD1306 initialised ({}x{})", SCREEN_WIDTH, SCREEN_HEIGHT);
        Ok(())
    }

    /// Render a cue and push it to the panel.
    pub fn show_cue(&mut self, cue: DisplayCue) -> Result<(), DisplayError<B::Error>> {
        render_cue(&mut self.frame, cue).unwrap_or_else(|never| match never {});
        self.flush()
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    /// Write the whole framebuffer (all 8 pages).
    pub fn flush(&mut self) -> Result<(), DisplayError<B::Error>> {
        self.command(&[0x21, 0, (SCREEN_WIDTH - 1) as u8, 0x22, 0, (SCREEN_HEIGHT / 8 - 1) as u8])?;

        let mut bus = self.bus.lock().map_err(|_| DisplayError::BusPoisoned)?;
        let mut packet = [0u8; DATA_CHUNK + 1];
        packet[0] = CONTROL_DATA;
        for chunk in self.frame.as_bytes().chunks(DATA_CHUNK) {
            packet[1..=chunk.len()].copy_from_slice(chunk);
            bus.write(I2C_ADDR_OLED, &packet[..=chunk.len()])
                .map_err(DisplayError::Bus)?;
        }
        Ok(())
    }

    fn command(&self, cmds: &[u8]) -> Result<(), DisplayError<B::Error>> {
        let mut packet = Vec::with_capacity(cmds.len() + 1);
        packet.push(CONTROL_COMMAND);
        packet.extend_from_slice(cmds);

        let mut bus = self.bus.lock().map_err(|_| DisplayError::BusPoisoned)?;
        bus.write(I2C_ADDR_OLED, &packet).map_err(DisplayError::Bus)
    }
}

impl<B: I2cBus + 'static> DisplayService for OledDisplay<B> {
    fn show(&mut self, cue: DisplayCue) {
        if let Err(e) = self.show_cue(cue) {
            log::warn!("Display error showing {:?}: {}", cue, e);
        }
    }
}

/// Display stand-in that only logs cues (host simulation).
#[derive(Debug, Default)]
pub struct LogDisplay;

impl DisplayService for LogDisplay {
    fn show(&mut self, cue: DisplayCue) {
        log::info!("[display] {:?} \"{}\"", cue, cue.label());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::bus::mock::MockBus;

    fn lit(frame: &FrameBuffer) -> usize {
        frame.as_bytes().iter().map(|b| b.count_ones() as usize).sum()
    }

    #[test]
    fn test_framebuffer_page_layout() {
        let mut frame = FrameBuffer::new();
        frame
            .draw_iter([Pixel(Point::new(5, 10), BinaryColor::On)])
            .unwrap();
        assert!(frame.pixel(5, 10));
        assert_eq!(frame.as_bytes()[5 + 128], 1 << 2);

        frame
            .draw_iter([
                Pixel(Point::new(5, 10), BinaryColor::Off),
                Pixel(Point::new(-1, 3), BinaryColor::On),
                Pixel(Point::new(200, 3), BinaryColor::On),
            ])
            .unwrap();
        assert_eq!(lit(&frame), 0);
    }

    #[test]
    fn test_turn_glyphs_point_the_right_way() {
        let mut frame = FrameBuffer::new();
        render_cue(&mut frame, DisplayCue::TurnLeftStart).unwrap();
        assert!(frame.pixel(40, 24));
        assert!(!frame.pixel(88, 24));

        render_cue(&mut frame, DisplayCue::TurnRightStart).unwrap();
        assert!(frame.pixel(88, 24));
        assert!(!frame.pixel(40, 24));
    }

    #[test]
    fn test_idle_variants_differ() {
        let mut a = FrameBuffer::new();
        let mut b = FrameBuffer::new();
        render_cue(&mut a, DisplayCue::Idle(2)).unwrap();
        render_cue(&mut b, DisplayCue::Idle(7)).unwrap();
        assert!(lit(&a) > 0);
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_show_cue_flushes_every_page() {
        let bus = MockBus::default().leak();
        let mut display = OledDisplay::new(bus);
        display.show_cue(DisplayCue::BrakeStart).unwrap();

        let guard = bus.lock().unwrap();
        let (address, data): (Vec<_>, Vec<_>) = guard
            .writes
            .iter()
            .partition(|(_, bytes)| bytes[0] == CONTROL_COMMAND);
        assert_eq!(address.len(), 1);
        assert_eq!(data.len(), DISPLAY_BUFFER_SIZE / DATA_CHUNK);
        let flushed: Vec<u8> = data.iter().flat_map(|(_, bytes)| bytes[1..].to_vec()).collect();
        assert_eq!(flushed.as_slice(), display.frame().as_bytes());
    }

    #[test]
    fn test_bus_failure_is_swallowed_by_service() {
        let bus = MockBus {
            fail: true,
            ..Default::default()
        }
        .leak();
        let mut display = OledDisplay::new(bus);
        assert!(!display.is_connected());
        assert!(display.init().is_err());
        // Fire-and-forget path only logs.
        display.show(DisplayCue::TurnRightEnd);
    }
}
