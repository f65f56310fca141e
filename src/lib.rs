//! pcfx-soundbox - PC-FX SoundBox ADPCM/PSG synthesis engine
//!
//! This library emulates the PC-FX audio chip: two ADPCM channels streamed
//! from KING, the PSG register window, CD-DA volume control and the
//! band-limited synthesis path down to host PCM.

pub mod audio;
pub mod config;
pub mod error;
pub mod soundbox;
pub mod wav_writer;

pub use config::SoundBoxConfig;
pub use error::SoundBoxError;
pub use soundbox::ports::{NullPsg, Psg, SoundBoxBus};
pub use soundbox::{FlushOutput, SoundBox};
