use mirror_ngin::{
    flow::{self, FlowConstructor},
    scenes::lighting::{self, LightingParams},
};

fn main() {
    let scene: FlowConstructor<(), ()> = lighting::constructor(LightingParams::default());
    if let Err(e) = flow::run(vec![scene]) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
