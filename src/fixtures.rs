// Shared in-memory accident table for unit tests.
use crate::dataset::Dataset;
use crate::derive;
use crate::loader::load_from_reader;

pub const HEADER: &str = "State,Industry Sector,Accident Type,Accident Severity,Year,Month,\
    DayOfWeek,Shift,Hour Type,Age,Gender,Employee Type,Critical Risk,Safety Gear,Local";

pub const CSV: &str = "\
State,Industry Sector,Accident Type,Accident Severity,Year,Month,DayOfWeek,Shift,Hour Type,Age,Gender,Employee Type,Critical Risk,Safety Gear,Local
Kerala,Chemical,Fire,Major,2020,January,Monday,Morning,Regular,18,Male,Permanent,Explosion,Yes,Kochi
Kerala,Mining,Fall,Minor,2021,March,Tuesday,Night,Overtime,22,Female,Contract,Height,No,Kochi
Kerala,Chemical,Fire,Fatal,2021,January,Monday,Morning,Regular,23,Male,Permanent,Explosion,No,Alappuzha
Gujarat,Chemical,Gas Leak,Major,2020,February,Sunday,Evening,Regular,30,Male,Contract,Toxic,Yes,Surat
Gujarat,Textile,Fall,Minor,2020,January,Friday,Morning,Overtime,45,Female,Permanent,Height,Yes,Surat
Gujarat,Textile,Fire,Fatal,2021,December,Wednesday,Night,Regular,64,Male,Contract,Explosion,No,Vadodara
Gujarat,Mining,Fall,Minor,2021,March,Monday,Evening,Regular,50,Male,Permanent,Height,Yes,Surat
Orissa,Mining,Gas Leak,Fatal,2022,July,Thursday,Night,Overtime,66,Male,Contract,Toxic,No,Cuttack
Orissa,Mining,Fall,Minor,2022,January,Saturday,Morning,Regular,38,Female,Contract,Height,Yes,Cuttack
Gujarat,Chemical,Fire,Major,2022,February,Monday,Morning,Regular,27,Male,Permanent,Explosion,Yes,Surat
";

/// The fixture as loaded, without derived columns.
pub fn raw_dataset() -> Dataset {
    load_from_reader(CSV.as_bytes()).expect("fixture parses")
}

/// The fixture after the standard derivations the app applies.
pub fn dataset() -> Dataset {
    derive::prepare(raw_dataset()).expect("fixture derives")
}
