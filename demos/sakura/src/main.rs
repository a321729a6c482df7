use mirror_ngin::{
    flow::{self, FlowConstructor},
    scenes::sakura::{self, SakuraParams},
};

fn main() {
    let scene: FlowConstructor<(), ()> = sakura::constructor(SakuraParams::default());
    if let Err(e) = flow::run(vec![scene]) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
