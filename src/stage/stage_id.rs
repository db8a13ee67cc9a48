crate::define_stage_ids! {
    /// Sub-buildpacks the web servers group can run
    StageId {
        CaCertificates => "paketo-buildpacks/ca-certificates" : "Buildpack for CA Certificates" | "ca-certificates",
        NodeEngine => "paketo-buildpacks/node-engine" : "Buildpack for Node Engine" | "node-engine",
        Yarn => "paketo-buildpacks/yarn" : "Buildpack for Yarn" | "yarn",
        YarnInstall => "paketo-buildpacks/yarn-install" : "Buildpack for Yarn Install" | "yarn-install",
        NpmInstall => "paketo-buildpacks/npm-install" : "Buildpack for NPM Install" | "npm-install",
        NodeRunScript => "paketo-buildpacks/node-run-script" : "Buildpack for Node Run Script" | "node-run-script",
        Nginx => "paketo-buildpacks/nginx" : "Buildpack for Nginx Server" | "nginx",
        Httpd => "paketo-buildpacks/httpd" : "Buildpack for Apache HTTP Server" | "httpd",
        EnvironmentVariables => "paketo-buildpacks/environment-variables" : "Buildpack for Environment Variables" | "environment-variables",
        ImageLabels => "paketo-buildpacks/image-labels" : "Buildpack for Image Labels" | "image-labels",
        Watchexec => "paketo-buildpacks/watchexec" : "Buildpack for Watchexec" | "watchexec",
        Procfile => "paketo-buildpacks/procfile" : "Buildpack for Procfile" | "procfile",
        SourceRemoval => "paketo-buildpacks/source-removal" : "Buildpack for Source Removal" | "source-removal",
    }
}
