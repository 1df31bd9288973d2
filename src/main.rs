use ZNDStab::Examples::neutral_stability_examples::neutral_stability_examples;
use ZNDStab::Examples::normal_modes_examples::normal_modes_examples;
use ZNDStab::Utils::logger::init_logger;
use log::LevelFilter;

pub fn main() {
    //
    init_logger(LevelFilter::Info, None).unwrap();
    let task: usize = 1;
    normal_modes_examples(task);
    neutral_stability_examples(0);
}
