//! Synthetic participant logs shared by the integration tests

use std::fs;
use std::path::Path;

/// Write `days` of wellness and sRPE logs for each participant
///
/// Exertion falls as readiness and sleep rise, so a fitted model has a
/// clear signal to find.
pub fn write_dataset(root: &Path, participants: &[&str], days: u32) {
    for (p, participant) in participants.iter().enumerate() {
        let dir = root.join(participant).join("pmsys");
        fs::create_dir_all(&dir).unwrap();

        let mut wellness = String::from(
            "effective_time_frame,fatigue,mood,readiness,sleep_duration_h,sleep_quality,soreness,soreness_area,stress\n",
        );
        let mut srpe = String::from("activity_names,end_date_time,perceived_exertion,duration_min\n");

        for day in 0..days {
            let date = chrono::NaiveDate::from_ymd_opt(2019, 11, 1).unwrap() + chrono::Duration::days(day as i64);
            let readiness = ((day + p as u32) % 11) as f64;
            let sleep = ((day * 3 + p as u32) % 11) as f64;
            let stress = ((day * 7) % 11) as f64;
            let soreness = ((day * 5 + 2) % 11) as f64;
            let exertion = 9.0 - 0.4 * readiness - 0.2 * sleep + 0.1 * stress;

            wellness.push_str(&format!(
                "{}T09:29:17.000Z,3,3,{},8,{},{},[],{}\n",
                date, readiness, sleep, soreness, stress
            ));
            srpe.push_str(&format!(
                "running,{}T18:00:00.000Z,{:.2},60\n",
                date, exertion
            ));
        }

        fs::write(dir.join("wellness.csv"), wellness).unwrap();
        fs::write(dir.join("srpe.csv"), srpe).unwrap();
    }
}
