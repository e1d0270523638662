pub mod bail;
pub mod board;
pub mod case;
pub mod complainant;
pub mod crime_level;
pub mod decision;
pub mod evidence;
pub mod interrogation;
pub mod review;
pub mod submission;
pub mod suspect;
pub mod trial;
pub mod user;
