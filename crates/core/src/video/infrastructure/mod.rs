pub mod ffmpeg_vision_reader;
