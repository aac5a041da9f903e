//! Non-negative integer cell size.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Size {
  width: u32,
  height: u32,
}

impl Size {
  pub const ZERO: Size = Size { width: 0, height: 0 };

  pub fn new(width: u32, height: u32) -> Self {
    Size { width, height }
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn is_zero(&self) -> bool {
    self.width == 0 || self.height == 0
  }
}

impl From<(u32, u32)> for Size {
  fn from((width, height): (u32, u32)) -> Self {
    Size::new(width, height)
  }
}
