use clap::Args;

pub mod add;
pub mod list;
pub mod remove;

use crate::cli::op::Op;

crate::command_enum! {
    (List, list::List),
    (Add, add::Add),
    (Remove, remove::Remove),
}

#[derive(Args, Debug, Clone)]
pub struct Events {
    #[command(subcommand)]
    pub command: Command,
}

#[async_trait::async_trait]
impl Op for Events {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}
