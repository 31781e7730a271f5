pub mod command;
pub mod frame;
pub mod protos;
pub mod quantizer;
pub mod transmit;
pub mod waveform;
