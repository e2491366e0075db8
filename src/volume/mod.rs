pub mod f32;
pub mod traits;
pub mod u8;

pub use self::f32::VolumeF32;
pub use self::traits::VolumeView;
pub use self::u8::VolumeU8;
